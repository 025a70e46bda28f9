//! # Swap Executor
//!
//! Position exchange, discharge, and cascade rotation of assemblies.
//!
//! Every relocation goes through `SwapExecutor`, which:
//! - records each touched assembly once in the `MovedLedger`, with the
//!   location it held before its first move
//! - keeps stationary blocks (grid plates and the like) at their physical
//!   location by trading them between the two assemblies involved
//! - validates before mutating, so a failing swap leaves locations untouched
//!
//! Moves are not transactional across calls: a failure part-way through a
//! cascade leaves the earlier swaps applied.

use crate::reactor::CoreStore;
use crate::{AssemblyId, Flags, Location, RefuelError};
use indexmap::IndexSet;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// =============================================================================
// MOVED LEDGER
// =============================================================================

/// Assemblies touched this outage.
///
/// Insertion order drives history writing; membership checks are O(1).
#[derive(Debug, Clone, Default)]
pub struct MovedLedger {
    order: IndexSet<AssemblyId>,
    origins: BTreeMap<AssemblyId, Location>,
}

impl MovedLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` with the location it held before moving.
    ///
    /// Returns `false` (and keeps the first origin) if already recorded.
    pub fn record(&mut self, id: AssemblyId, origin: Location) -> bool {
        if self.order.insert(id) {
            self.origins.insert(id, origin);
            true
        } else {
            false
        }
    }

    /// Membership check.
    #[must_use]
    pub fn contains(&self, id: AssemblyId) -> bool {
        self.order.contains(&id)
    }

    /// Where the assembly was before its first move this outage.
    #[must_use]
    pub fn origin_of(&self, id: AssemblyId) -> Option<Location> {
        self.origins.get(&id).copied()
    }

    /// Assemblies in the order they were first moved.
    pub fn iter(&self) -> impl Iterator<Item = AssemblyId> + '_ {
        self.order.iter().copied()
    }

    /// Number of unique assemblies moved.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// =============================================================================
// SWAP EXECUTOR
// =============================================================================

/// Applies relocations to a core model and keeps the moved ledger.
///
/// Holds the core borrow for one outage only.
pub struct SwapExecutor<'a, S: CoreStore> {
    store: &'a mut S,
    ledger: MovedLedger,
    stationary: Flags,
}

impl<'a, S: CoreStore> SwapExecutor<'a, S> {
    /// Create an executor. `stationary` selects the block flags that stay put.
    pub fn new(store: &'a mut S, stationary: Flags) -> Self {
        Self {
            store,
            ledger: MovedLedger::new(),
            stationary,
        }
    }

    /// Read access to the core model.
    pub fn store(&self) -> &S {
        self.store
    }

    /// Write access to the core model.
    pub fn store_mut(&mut self) -> &mut S {
        self.store
    }

    /// The moved ledger.
    pub fn ledger(&self) -> &MovedLedger {
        &self.ledger
    }

    /// Give up the core borrow and keep the ledger.
    pub fn into_ledger(self) -> MovedLedger {
        self.ledger
    }

    /// Trade stationary blocks so they stay with the original locations.
    ///
    /// Fails without modifying anything if the two assemblies hold stationary
    /// blocks at different axial indices.
    pub fn transfer_stationary_blocks(
        &mut self,
        first: AssemblyId,
        second: AssemblyId,
    ) -> Result<(), RefuelError> {
        if self.stationary.is_empty() {
            return Ok(());
        }

        let a1 = self
            .store
            .assembly(first)
            .ok_or(RefuelError::AssemblyNotFound(first))?;
        let a2 = self
            .store
            .assembly(second)
            .ok_or(RefuelError::AssemblyNotFound(second))?;

        let s1: Vec<_> = a1
            .stationary_blocks(&self.stationary)
            .into_iter()
            .map(|(i, b)| (i, b.clone()))
            .collect();
        let s2: Vec<_> = a2
            .stationary_blocks(&self.stationary)
            .into_iter()
            .map(|(i, b)| (i, b.clone()))
            .collect();

        if s1.is_empty() && s2.is_empty() {
            info!(
                first = %first,
                second = %second,
                "no stationary blocks to transfer"
            );
            return Ok(());
        }

        let i1: Vec<usize> = s1.iter().map(|(i, _)| *i).collect();
        let i2: Vec<usize> = s2.iter().map(|(i, _)| *i).collect();
        if i1 != i2 {
            return Err(RefuelError::StationaryMismatch {
                first,
                second,
                first_indices: i1,
                second_indices: i2,
            });
        }

        if let (Some((_, top1)), Some((_, top2))) = (s1.last(), s2.last())
            && top1.z_top != top2.z_top
        {
            warn!(
                first = %first,
                second = %second,
                first_top = top1.z_top,
                second_top = top2.z_top,
                "topmost stationary blocks end at different elevations"
            );
        }

        for ((index, block1), (_, block2)) in s1.into_iter().zip(s2) {
            if let Some(a) = self.store.assembly_mut(first) {
                a.blocks[index] = block2;
            }
            if let Some(a) = self.store.assembly_mut(second) {
                a.blocks[index] = block1;
            }
        }
        Ok(())
    }

    /// Exchange the core locations of two assemblies.
    ///
    /// Missing assemblies are a logged no-op.
    pub fn swap_assemblies(
        &mut self,
        first: Option<AssemblyId>,
        second: Option<AssemblyId>,
    ) -> Result<(), RefuelError> {
        let (Some(first), Some(second)) = (first, second) else {
            warn!(?first, ?second, "swap skipped: an assembly is missing");
            return Ok(());
        };
        if first == second {
            debug!(assembly = %first, "swap with itself ignored");
            return Ok(());
        }

        let loc1 = self
            .store
            .location_of(first)
            .ok_or(RefuelError::NotInCore(first))?;
        let loc2 = self
            .store
            .location_of(second)
            .ok_or(RefuelError::NotInCore(second))?;

        self.ledger.record(first, loc1);
        self.ledger.record(second, loc2);

        self.transfer_stationary_blocks(first, second)?;
        self.store.exchange_locations(first, second)?;

        debug!(%loc1, %loc2, "swapped assemblies");
        Ok(())
    }

    /// Discharge `outgoing` and put `incoming` in its place.
    ///
    /// `incoming` is pulled from the spent fuel pool if it is there.
    pub fn discharge_swap(
        &mut self,
        incoming: Option<AssemblyId>,
        outgoing: Option<AssemblyId>,
    ) -> Result<(), RefuelError> {
        let (Some(incoming), Some(outgoing)) = (incoming, outgoing) else {
            warn!(?incoming, ?outgoing, "discharge swap skipped: an assembly is missing");
            return Ok(());
        };

        let location = self
            .store
            .location_of(outgoing)
            .ok_or(RefuelError::NotInCore(outgoing))?;
        if self.store.location_of(incoming).is_some() {
            return Err(RefuelError::AlreadyInCore(incoming));
        }
        if self.store.assembly(incoming).is_none() {
            return Err(RefuelError::AssemblyNotFound(incoming));
        }
        let from_pool = self.store.sfp_contains(incoming);

        self.ledger.record(outgoing, location);
        self.ledger.record(
            incoming,
            if from_pool {
                Location::Sfp
            } else {
                Location::LoadQueue
            },
        );

        self.transfer_stationary_blocks(incoming, outgoing)?;

        let equivalents = self.store.symmetric_equivalent_count(&location);
        self.store.remove_assembly(&location)?;
        if let Some(a) = self.store.assembly_mut(outgoing) {
            a.multiplicity = equivalents + 1;
        }

        if from_pool {
            self.store.sfp_remove(incoming);
        }
        self.store.place_assembly(incoming, &location)?;
        if let Some(a) = self.store.assembly_mut(incoming) {
            a.multiplicity = 1;
        }

        debug!(%location, from_pool, "discharged and charged");
        Ok(())
    }

    /// Rotate a chain of assemblies through their positions.
    ///
    /// Swaps `chain[0]` with each later element in turn, so `[D, C, B, A]`
    /// leaves C where D was, B where C was, A where B was and D where A was.
    pub fn swap_cascade(&mut self, chain: &[Option<AssemblyId>]) -> Result<(), RefuelError> {
        let mut counts: BTreeMap<AssemblyId, usize> = BTreeMap::new();
        for id in chain.iter().flatten() {
            *counts.entry(*id).or_default() += 1;
        }
        for (id, count) in counts.iter().filter(|(_, c)| **c > 1) {
            warn!(assembly = %id, count, "assembly appears more than once in cascade");
        }

        let Some(head) = chain.first() else {
            return Ok(());
        };
        for (step, next) in chain.iter().enumerate().skip(1) {
            match (head, next) {
                (Some(_), Some(_)) => self.swap_assemblies(*head, *next)?,
                _ => info!(step, "cascade slot not materialized, skipped"),
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
