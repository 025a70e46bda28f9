//! # Scheduled Shuffle
//!
//! Built-in `ShuffleLogic`: walk a ring schedule from the discharge end to the
//! charge end, pick one assembly per ring, cascade them, and charge a fresh
//! assembly where the last pick was.

use crate::outage::{FuelHandler, ShuffleLogic};
use crate::reactor::CoreStore;
use crate::schedule::RingSchedule;
use crate::search::{AssemblyQuery, Bound};
use crate::{AssemblyId, RefuelError, TypeFilter};
use tracing::{debug, info};

/// Ring-schedule driven cascade strategy.
#[derive(Debug, Clone)]
pub struct ScheduledShuffle {
    schedule: RingSchedule,
    assem_type: String,
    enrich_list: Vec<f64>,
    filter: TypeFilter,
    param: Option<String>,
    compare_to: f64,
}

impl ScheduledShuffle {
    /// Charge fresh `assem_type` assemblies along `schedule`.
    ///
    /// `schedule.rings` runs from the discharge ring to the charge ring.
    #[must_use]
    pub fn new(schedule: RingSchedule, assem_type: impl Into<String>) -> Self {
        Self {
            schedule,
            assem_type: assem_type.into(),
            enrich_list: Vec::new(),
            filter: TypeFilter::any(),
            param: None,
            compare_to: 0.0,
        }
    }

    /// Only move assemblies matching `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: TypeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// In each ring, pick the assembly whose `param` is closest to `compare_to`.
    #[must_use]
    pub fn ranked_by(mut self, param: impl Into<String>, compare_to: f64) -> Self {
        self.param = Some(param.into());
        self.compare_to = compare_to;
        self
    }

    /// Enrichments for the fresh assembly; empty keeps the type's defaults.
    #[must_use]
    pub fn with_enrichment(mut self, enrich_list: Vec<f64>) -> Self {
        self.enrich_list = enrich_list;
        self
    }
}

impl<S: CoreStore> ShuffleLogic<S> for ScheduledShuffle {
    fn choose_swaps(&mut self, handler: &mut FuelHandler<'_, S>) -> Result<(), RefuelError> {
        let mut picks: Vec<AssemblyId> = Vec::with_capacity(self.schedule.len());

        for (ring, width) in self.schedule.iter() {
            let mut query = AssemblyQuery::new()
                .target_ring(ring)
                .width(width, 0)
                .type_filter(self.filter.clone())
                .exclude(picks.iter().copied());
            if let Some(param) = &self.param {
                query = query
                    .param(param.as_str())
                    .compare_to(Bound::value(self.compare_to));
            }

            match handler.find_assembly(&query)? {
                Some(id) => {
                    debug!(ring, assembly = %id, "picked assembly");
                    picks.push(id);
                }
                None => info!(ring, width, "no assembly found for ring"),
            }
        }

        let Some(&discharged) = picks.first() else {
            info!(cycle = handler.cycle(), "schedule found nothing to move");
            return Ok(());
        };

        // picks[0] leaves the core; everything else moves one slot inward in
        // the pick order, so the last pick's location is freed for the charge.
        let cascade: Vec<Option<AssemblyId>> = picks.iter().copied().map(Some).collect();
        handler.swap_cascade(&cascade)?;

        let fresh = handler.create_assembly(&self.assem_type, &self.enrich_list)?;
        handler.discharge_swap(Some(fresh), Some(discharged))?;
        info!(
            cycle = handler.cycle(),
            moved = picks.len(),
            "scheduled shuffle applied"
        );
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
