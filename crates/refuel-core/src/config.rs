//! # Shuffle Settings
//!
//! Serde-backed settings for a shuffle run. The engine never reads files
//! itself; callers deserialize from whatever source they use (the CLI reads
//! TOML) and call `validate` before use.

use crate::formats::ShuffleFormat;
use crate::logic::ScheduledShuffle;
use crate::schedule::{RingSchedule, build_ring_schedule};
use crate::{Flags, RefuelError, TypeFilter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShuffleSettings {
    /// Case name; the legacy history file is `<case_title>-SHUFFLES.txt`.
    pub case_title: String,
    /// Block flags that stay at their location when assemblies move.
    pub stationary_block_flags: Vec<String>,
    /// Recorded shuffle file to replay instead of running a strategy.
    pub explicit_repeat_shuffles: Option<PathBuf>,
    /// Built-in strategy parameters. The CLI reads only the ring fields.
    pub schedule: Option<ScheduleSettings>,
}

impl Default for ShuffleSettings {
    fn default() -> Self {
        Self {
            case_title: "refuel".to_string(),
            stationary_block_flags: vec!["grid plate".to_string()],
            explicit_repeat_shuffles: None,
            schedule: None,
        }
    }
}

/// Parameters of the built-in ring-schedule strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleSettings {
    pub max_ring: u32,
    pub charge_ring: Option<u32>,
    pub discharge_ring: Option<u32>,
    pub jump_ring_from: Option<u32>,
    pub jump_ring_to: Option<u32>,
    pub coarse_factor: f64,
    // Search fields below are consumed by `strategy()` only.
    /// Type of the fresh assemblies charged.
    pub assembly_type: String,
    /// Flags a moved assembly must carry.
    pub assembly_flags: Vec<String>,
    /// Parameter used to rank candidates within a ring.
    pub param: Option<String>,
    pub compare_to: f64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            max_ring: 1,
            charge_ring: None,
            discharge_ring: None,
            jump_ring_from: None,
            jump_ring_to: None,
            coarse_factor: 0.0,
            assembly_type: "fuel".to_string(),
            assembly_flags: Vec::new(),
            param: None,
            compare_to: 0.0,
        }
    }
}

impl ShuffleSettings {
    /// Reject settings no run could use.
    pub fn validate(&self) -> Result<(), RefuelError> {
        if self.case_title.trim().is_empty() {
            return Err(RefuelError::Config("case_title must not be empty".into()));
        }
        if let Some(schedule) = &self.schedule {
            schedule.validate()?;
        }
        Ok(())
    }

    pub fn stationary_flags(&self) -> Flags {
        Flags::from_names(&self.stationary_block_flags)
    }

    /// Codec of the repeat-shuffle file, if one is configured.
    pub fn repeat_shuffle_format(&self) -> Option<ShuffleFormat> {
        self.explicit_repeat_shuffles
            .as_deref()
            .map(ShuffleFormat::from_path)
    }

    /// Where a legacy history for this case lives inside `dir`.
    pub fn legacy_history_path(&self, dir: &Path) -> PathBuf {
        dir.join(crate::formats::legacy_file_name(&self.case_title))
    }
}

impl ScheduleSettings {
    pub fn validate(&self) -> Result<(), RefuelError> {
        if !(0.0..1.0).contains(&self.coarse_factor) {
            return Err(RefuelError::Config(format!(
                "coarse_factor {} is outside [0, 1)",
                self.coarse_factor
            )));
        }
        let rings = [
            Some(self.max_ring),
            self.charge_ring,
            self.discharge_ring,
            self.jump_ring_from,
            self.jump_ring_to,
        ];
        if rings.into_iter().flatten().any(|r| r == 0) {
            return Err(RefuelError::Config("ring numbers start at 1".into()));
        }
        if self.assembly_type.trim().is_empty() {
            return Err(RefuelError::Config("assembly_type must not be empty".into()));
        }
        Ok(())
    }

    /// Build the ring schedule these settings describe.
    pub fn ring_schedule(&self) -> Result<RingSchedule, RefuelError> {
        build_ring_schedule(
            self.max_ring,
            self.charge_ring,
            self.discharge_ring,
            self.jump_ring_from,
            self.jump_ring_to,
            self.coarse_factor,
        )
    }

    /// Build the strategy these settings describe.
    pub fn strategy(&self) -> Result<ScheduledShuffle, RefuelError> {
        self.validate()?;
        let mut logic = ScheduledShuffle::new(self.ring_schedule()?, self.assembly_type.as_str())
            .with_filter(TypeFilter::superset_of(Flags::from_names(&self.assembly_flags)));
        if let Some(param) = &self.param {
            logic = logic.ranked_by(param.as_str(), self.compare_to);
        }
        Ok(logic)
    }
}

// =============================================================================
// TESTS
// =============================================================================
