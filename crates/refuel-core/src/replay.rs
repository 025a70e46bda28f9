//! # Repeat Shuffle
//!
//! Replays reconstructed chains against a core model.
//!
//! Every chain location is resolved to its assembly from a single snapshot
//! taken before any move, so later swaps cannot change which assembly a
//! location refers to.

use crate::chain::{LoadChain, ProcessedMoves};
use crate::reactor::CoreStore;
use crate::swap::SwapExecutor;
use crate::{AssemblyId, Location, RefuelError};
use std::collections::BTreeMap;
use tracing::{debug, warn};

fn resolve(
    snapshot: &BTreeMap<Location, AssemblyId>,
    locations: &[Location],
) -> Result<Vec<AssemblyId>, RefuelError> {
    locations
        .iter()
        .map(|l| snapshot.get(l).copied().ok_or(RefuelError::EmptyLocation(*l)))
        .collect()
}

/// Swap `chain[0]` with every later element, outermost first.
///
/// Afterwards each assembly sits one step further along the chain and the
/// assembly from the last location sits at the first.
fn shift_along<S: CoreStore>(
    executor: &mut SwapExecutor<'_, S>,
    assemblies: &[AssemblyId],
) -> Result<(), RefuelError> {
    let Some(&head) = assemblies.first() else {
        return Ok(());
    };
    for &other in assemblies[1..].iter().rev() {
        executor.swap_assemblies(Some(head), Some(other))?;
    }
    Ok(())
}

fn materialize_charge<S: CoreStore>(
    executor: &mut SwapExecutor<'_, S>,
    chain: &LoadChain,
    discharged: AssemblyId,
) -> Result<AssemblyId, RefuelError> {
    let charge = &chain.charge;
    if let Some(name) = &charge.load_name {
        return executor
            .store()
            .sfp_get_by_name(name)
            .ok_or_else(|| RefuelError::NotInSfp(name.clone()));
    }

    let assem_type = match &charge.assem_type {
        Some(kind) => kind.clone(),
        None => {
            let inferred = executor
                .store()
                .assembly(discharged)
                .ok_or(RefuelError::AssemblyNotFound(discharged))?
                .assem_type
                .clone();
            warn!(
                assem_type = %inferred,
                "charge has no recorded assembly type; reusing the discharged assembly's type"
            );
            inferred
        }
    };
    executor
        .store_mut()
        .create_assembly(&assem_type, &charge.enrich_list)
}

/// Apply a cycle's chains to the core.
///
/// Returns every assembly the replay moved, in the order first moved.
pub fn do_repeat_shuffle<S: CoreStore>(
    executor: &mut SwapExecutor<'_, S>,
    processed: &ProcessedMoves,
) -> Result<Vec<AssemblyId>, RefuelError> {
    let snapshot: BTreeMap<Location, AssemblyId> =
        executor.store().occupied_locations().into_iter().collect();
    let already_moved = executor.ledger().len();

    for chain in &processed.load_chains {
        let assemblies = resolve(&snapshot, &chain.locations)?;
        let Some(&discharged) = assemblies.last() else {
            continue;
        };
        shift_along(executor, &assemblies)?;

        let incoming = materialize_charge(executor, chain, discharged)?;
        executor.discharge_swap(Some(incoming), Some(discharged))?;
        debug!(locations = ?chain.locations, "replayed load chain");
    }

    for chain in &processed.loop_chains {
        let assemblies = resolve(&snapshot, chain)?;
        shift_along(executor, &assemblies)?;
        debug!(locations = ?chain, "replayed loop chain");
    }

    Ok(executor.ledger().iter().skip(already_moved).collect())
}

// =============================================================================
// TESTS
// =============================================================================
