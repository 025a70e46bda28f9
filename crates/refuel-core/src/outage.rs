//! # Outage Session
//!
//! One refueling outage against one core model.
//!
//! A `FuelHandler` borrows the core for the duration of the outage. Moves are
//! chosen either by a `ShuffleLogic` strategy or by replaying a recorded
//! `ShuffleSequence`. `outage` consumes the handler, applies pending
//! rotations, and returns the recorded moves for the cycle.
//!
//! Errors abort the outage. Moves already applied stay applied.

use crate::chain::process_move_list;
use crate::reactor::CoreStore;
use crate::replay::do_repeat_shuffle;
use crate::search::{self, AssemblyQuery};
use crate::swap::SwapExecutor;
use crate::{AssemblyId, Flags, Location, MoveRecord, RefuelError, ShuffleSequence};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

// =============================================================================
// STRATEGY TRAIT
// =============================================================================

/// Decides the moves of an outage.
///
/// Implementations call back into the handler to search, swap, discharge and
/// rotate. They must not assume any state beyond what the handler exposes.
pub trait ShuffleLogic<S: CoreStore> {
    fn choose_swaps(&mut self, handler: &mut FuelHandler<'_, S>) -> Result<(), RefuelError>;
}

/// Where an outage's moves come from.
pub enum OutagePlan<'p, S: CoreStore> {
    /// Let a strategy choose.
    Strategy(&'p mut dyn ShuffleLogic<S>),
    /// Replay the handler's cycle from a recorded sequence.
    Repeat(&'p ShuffleSequence),
}

/// Outcome of one outage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutageReport {
    pub cycle: u32,
    /// Recorded moves, in the order assemblies were first moved.
    pub moves: Vec<MoveRecord>,
    /// Number of distinct assemblies moved.
    pub unique_moved: usize,
    /// `(before, after)` location of each moved assembly.
    pub coordinate_pairs: Vec<(Location, Location)>,
}

impl OutageReport {
    /// Store this cycle's moves in a sequence, replacing any previous entry.
    pub fn record_into(&self, sequence: &mut ShuffleSequence) {
        sequence.set_cycle(self.cycle, self.moves.clone());
    }
}

// =============================================================================
// FUEL HANDLER
// =============================================================================

/// Outage session over a core model.
pub struct FuelHandler<'a, S: CoreStore> {
    executor: SwapExecutor<'a, S>,
    cycle: u32,
    pending_rotations: Vec<(Location, f64)>,
}

impl<'a, S: CoreStore> FuelHandler<'a, S> {
    /// Open a session for `cycle`. `stationary_flags` marks blocks that stay put.
    pub fn new(store: &'a mut S, cycle: u32, stationary_flags: Flags) -> Self {
        Self {
            executor: SwapExecutor::new(store, stationary_flags),
            cycle,
            pending_rotations: Vec::new(),
        }
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Read access to the core model.
    pub fn store(&self) -> &S {
        self.executor.store()
    }

    pub fn find_assembly(&self, query: &AssemblyQuery) -> Result<Option<AssemblyId>, RefuelError> {
        search::find_assembly(self.executor.store(), query)
    }

    pub fn find_assemblies(&self, query: &AssemblyQuery) -> Result<Vec<AssemblyId>, RefuelError> {
        search::find_assemblies(self.executor.store(), query)
    }

    pub fn swap_assemblies(
        &mut self,
        first: Option<AssemblyId>,
        second: Option<AssemblyId>,
    ) -> Result<(), RefuelError> {
        self.executor.swap_assemblies(first, second)
    }

    pub fn discharge_swap(
        &mut self,
        incoming: Option<AssemblyId>,
        outgoing: Option<AssemblyId>,
    ) -> Result<(), RefuelError> {
        self.executor.discharge_swap(incoming, outgoing)
    }

    pub fn swap_cascade(&mut self, chain: &[Option<AssemblyId>]) -> Result<(), RefuelError> {
        self.executor.swap_cascade(chain)
    }

    /// Build a fresh, unplaced assembly.
    pub fn create_assembly(
        &mut self,
        assem_type: &str,
        enrich_list: &[f64],
    ) -> Result<AssemblyId, RefuelError> {
        self.executor
            .store_mut()
            .create_assembly(assem_type, enrich_list)
    }

    /// Rotate whatever assembly sits at `location` once all moves are done.
    pub fn queue_rotation(&mut self, location: Location, radians: f64) {
        self.pending_rotations.push((location, radians));
    }

    /// Run the outage and record its moves.
    pub fn outage(mut self, plan: OutagePlan<'_, S>) -> Result<OutageReport, RefuelError> {
        info!(cycle = self.cycle, "starting outage");
        match plan {
            OutagePlan::Strategy(logic) => logic.choose_swaps(&mut self)?,
            OutagePlan::Repeat(sequence) => {
                let moves = sequence.moves_for(self.cycle)?;
                let processed = process_move_list(moves)?;
                do_repeat_shuffle(&mut self.executor, &processed)?;
                for (location, radians) in processed.rotations {
                    self.queue_rotation(location, radians);
                }
            }
        }

        let rotated = self.apply_rotations()?;
        let report = self.record(&rotated)?;
        info!(
            cycle = report.cycle,
            unique_moved = report.unique_moved,
            "outage complete"
        );
        Ok(report)
    }

    fn apply_rotations(&mut self) -> Result<BTreeMap<AssemblyId, f64>, RefuelError> {
        let mut rotated: BTreeMap<AssemblyId, f64> = BTreeMap::new();
        for (location, radians) in std::mem::take(&mut self.pending_rotations) {
            let id = self
                .executor
                .store()
                .assembly_at(&location)
                .ok_or(RefuelError::EmptyLocation(location))?;
            if let Some(assembly) = self.executor.store_mut().assembly_mut(id) {
                assembly.rotate(radians);
            }
            *rotated.entry(id).or_default() += radians;
            debug!(%location, radians, "rotated assembly");
        }
        Ok(rotated)
    }

    fn record(&self, rotated: &BTreeMap<AssemblyId, f64>) -> Result<OutageReport, RefuelError> {
        let store = self.executor.store();
        let ledger = self.executor.ledger();
        let mut moves = Vec::with_capacity(ledger.len() + rotated.len());
        let mut coordinate_pairs = Vec::with_capacity(ledger.len());

        for id in ledger.iter() {
            let assembly = store.assembly(id).ok_or(RefuelError::AssemblyNotFound(id))?;
            let from = ledger.origin_of(id).unwrap_or(Location::LoadQueue);
            let to = store.location_of(id).unwrap_or(Location::Sfp);

            let mut record = MoveRecord::new(from, to)
                .with_enrichment(assembly.enrich_list())
                .with_type(assembly.assem_type.as_str());
            if from == Location::Sfp {
                record = record.with_name(assembly.name.as_str());
            }
            if let Some(radians) = rotated.get(&id) {
                record = record.with_rotation(*radians);
            }
            moves.push(record);
            coordinate_pairs.push((from, to));
        }

        for (id, radians) in rotated {
            if ledger.contains(*id) {
                continue;
            }
            let assembly = store.assembly(*id).ok_or(RefuelError::AssemblyNotFound(*id))?;
            let location = store.location_of(*id).ok_or(RefuelError::NotInCore(*id))?;
            moves.push(
                MoveRecord::rotation_at(location, *radians)
                    .with_enrichment(assembly.enrich_list())
                    .with_type(assembly.assem_type.as_str()),
            );
        }

        Ok(OutageReport {
            cycle: self.cycle,
            moves,
            unique_moved: ledger.len(),
            coordinate_pairs,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
