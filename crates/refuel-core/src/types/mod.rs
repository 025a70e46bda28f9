//! # Core Type Definitions
//!
//! This module contains all core types for the Refuel shuffle engine:
//! - Assembly and location identifiers (`AssemblyId`, `Location`)
//! - The assembly/block object model consumed by the engine (`Assembly`, `Block`, `Flags`)
//! - Relocation records (`MoveRecord`, `ShuffleSequence`)
//! - Error types (`RefuelError`, `ErrorClass`)
//!
//! ## Determinism Guarantees
//!
//! All identifiers and locations implement `Ord`, so every collection keyed by
//! them (`BTreeMap`/`BTreeSet`) iterates in the same order on every run.

use crate::primitives::{EX_CORE_LABEL, LOAD_QUEUE_LABEL, SFP_LABEL};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for an assembly owned by the core collaborator.
///
/// Search tie-breaks prefer the lower identifier, so ids must be stable for
/// the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssemblyId(pub u64);

impl fmt::Display for AssemblyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// LOCATION
// =============================================================================

/// A place an assembly can be: a grid position or an out-of-core state.
///
/// Labels:
/// - `RRR-PPP` for a grid position at axial level 0
/// - `RRR-PPP-AAA` for any other axial level
/// - `LoadQueue`, `SFP`, `ExCore` for the sentinels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Location {
    /// A position in the core grid. Ring 1 is the center.
    Grid { ring: u32, pos: u32, axial: u32 },
    /// The charge queue fresh assemblies come from.
    LoadQueue,
    /// The spent fuel pool.
    Sfp,
    /// Out of core, not tracked in the pool.
    ExCore,
}

impl Location {
    /// Grid position at axial level 0.
    #[must_use]
    pub const fn grid(ring: u32, pos: u32) -> Self {
        Self::Grid {
            ring,
            pos,
            axial: 0,
        }
    }

    /// `SFP` and `ExCore`: places assemblies are discharged to.
    #[must_use]
    pub const fn is_discharge(&self) -> bool {
        matches!(self, Self::Sfp | Self::ExCore)
    }

    /// `LoadQueue`: the charge-only source.
    #[must_use]
    pub const fn is_load_queue(&self) -> bool {
        matches!(self, Self::LoadQueue)
    }

    /// Any of the three out-of-core sentinels.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Grid { .. })
    }

    /// Ring index for grid locations.
    #[must_use]
    pub const fn ring(&self) -> Option<u32> {
        match self {
            Self::Grid { ring, .. } => Some(*ring),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid {
                ring,
                pos,
                axial: 0,
            } => write!(f, "{:03}-{:03}", ring, pos),
            Self::Grid { ring, pos, axial } => write!(f, "{:03}-{:03}-{:03}", ring, pos, axial),
            Self::LoadQueue => f.write_str(LOAD_QUEUE_LABEL),
            Self::Sfp => f.write_str(SFP_LABEL),
            Self::ExCore => f.write_str(EX_CORE_LABEL),
        }
    }
}

impl FromStr for Location {
    type Err = RefuelError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let label = label.trim();
        match label {
            LOAD_QUEUE_LABEL => return Ok(Self::LoadQueue),
            SFP_LABEL => return Ok(Self::Sfp),
            EX_CORE_LABEL => return Ok(Self::ExCore),
            _ => {}
        }

        let invalid = || RefuelError::InvalidLocation(label.to_string());
        let parts: Vec<&str> = label.split('-').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(invalid());
        }
        let mut numbers = Vec::with_capacity(parts.len());
        for part in &parts {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            numbers.push(part.parse::<u32>().map_err(|_| invalid())?);
        }

        let ring = numbers[0];
        let pos = numbers[1];
        let axial = numbers.get(2).copied().unwrap_or(0);
        if ring == 0 || pos == 0 {
            return Err(invalid());
        }
        Ok(Self::Grid { ring, pos, axial })
    }
}

impl TryFrom<String> for Location {
    type Error = RefuelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.to_string()
    }
}

// =============================================================================
// FLAGS & TYPE FILTERS
// =============================================================================

/// A set of lowercase descriptive flags ("fuel", "feed", "grid plate").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Flags(BTreeSet<String>);

impl Flags {
    /// Create an empty flag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a flag set from names. Names are lowercased and trimmed.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        )
    }

    /// Check membership of a single flag.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&name.to_lowercase())
    }

    /// True if every flag in `other` is present here.
    #[must_use]
    pub fn contains_all(&self, other: &Flags) -> bool {
        other.0.is_subset(&self.0)
    }

    /// True if any flag is shared.
    #[must_use]
    pub fn intersects(&self, other: &Flags) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    /// True when no flags are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate flag names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Filter on assembly flags.
///
/// `exact` demands equality; otherwise the assembly must carry a superset of
/// the filter's flags. An empty non-exact filter matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeFilter {
    pub flags: Flags,
    pub exact: bool,
}

impl TypeFilter {
    /// Match any assembly.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Superset match on the given flags.
    #[must_use]
    pub fn superset_of(flags: Flags) -> Self {
        Self {
            flags,
            exact: false,
        }
    }

    /// Exact match on the given flags.
    #[must_use]
    pub fn exactly(flags: Flags) -> Self {
        Self { flags, exact: true }
    }

    /// Apply the filter.
    #[must_use]
    pub fn matches(&self, flags: &Flags) -> bool {
        if self.exact {
            flags == &self.flags
        } else {
            flags.contains_all(&self.flags)
        }
    }
}

// =============================================================================
// BLOCKS & ASSEMBLIES
// =============================================================================

/// An axial sub-element of an assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub flags: Flags,
    /// Upper boundary elevation (cm).
    pub z_top: f64,
    /// U-235 enrichment in percent; only meaningful for fuel blocks.
    pub enrichment: f64,
}

impl Block {
    /// Create a block.
    #[must_use]
    pub fn new(name: impl Into<String>, flags: Flags, z_top: f64) -> Self {
        Self {
            name: name.into(),
            flags,
            z_top,
            enrichment: 0.0,
        }
    }

    /// Set the enrichment (builder style).
    #[must_use]
    pub fn with_enrichment(mut self, enrichment: f64) -> Self {
        self.enrichment = enrichment;
        self
    }

    /// True if the block carries the `fuel` flag.
    #[must_use]
    pub fn is_fuel(&self) -> bool {
        self.flags.contains("fuel")
    }
}

/// A reactor-core assembly as far as the shuffle engine needs to see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    pub id: AssemblyId,
    pub name: String,
    pub assem_type: String,
    pub flags: Flags,
    /// Blocks ordered bottom to top.
    pub blocks: Vec<Block>,
    pub params: BTreeMap<String, f64>,
    /// How many physical assemblies this model entry stands for.
    pub multiplicity: u32,
    /// Accumulated rotation (radians).
    pub orientation: f64,
}

impl Assembly {
    /// Create an assembly with no blocks and multiplicity 1.
    #[must_use]
    pub fn new(
        id: AssemblyId,
        name: impl Into<String>,
        assem_type: impl Into<String>,
        flags: Flags,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            assem_type: assem_type.into(),
            flags,
            blocks: Vec::new(),
            params: BTreeMap::new(),
            multiplicity: 1,
            orientation: 0.0,
        }
    }

    /// Read a parameter; absent parameters read as 0.0.
    #[must_use]
    pub fn param(&self, name: &str) -> f64 {
        self.params.get(name).copied().unwrap_or(0.0)
    }

    /// Set a parameter value.
    pub fn set_param(&mut self, name: impl Into<String>, value: f64) {
        self.params.insert(name.into(), value);
    }

    /// Fuel-block enrichments, bottom to top.
    #[must_use]
    pub fn enrich_list(&self) -> Vec<f64> {
        self.blocks
            .iter()
            .filter(|b| b.is_fuel())
            .map(|b| b.enrichment)
            .collect()
    }

    /// Blocks carrying any of `stationary`, with their axial index.
    #[must_use]
    pub fn stationary_blocks(&self, stationary: &Flags) -> Vec<(usize, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.flags.intersects(stationary))
            .collect()
    }

    /// Rotate in place by `radians`.
    pub fn rotate(&mut self, radians: f64) {
        self.orientation = (self.orientation + radians).rem_euclid(std::f64::consts::TAU);
    }
}

// =============================================================================
// MOVE RECORD
// =============================================================================

/// One recorded relocation. Immutable once built.
///
/// A zero-length record (`from == to`) with a rotation means "rotate in place".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    from: Location,
    to: Location,
    enrich_list: Vec<f64>,
    assem_type: Option<String>,
    name_at_discharge: Option<String>,
    rotation: Option<f64>,
}

impl MoveRecord {
    /// A bare move with no charge information.
    #[must_use]
    pub fn new(from: Location, to: Location) -> Self {
        Self {
            from,
            to,
            enrich_list: Vec::new(),
            assem_type: None,
            name_at_discharge: None,
            rotation: None,
        }
    }

    /// A rotate-in-place record.
    #[must_use]
    pub fn rotation_at(location: Location, radians: f64) -> Self {
        Self::new(location, location).with_rotation(radians)
    }

    #[must_use]
    pub fn with_enrichment(mut self, enrich_list: Vec<f64>) -> Self {
        self.enrich_list = enrich_list;
        self
    }

    #[must_use]
    pub fn with_type(mut self, assem_type: impl Into<String>) -> Self {
        self.assem_type = Some(assem_type.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_at_discharge = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, radians: f64) -> Self {
        self.rotation = Some(radians);
        self
    }

    pub fn from(&self) -> Location {
        self.from
    }

    pub fn to(&self) -> Location {
        self.to
    }

    /// Axial enrichments, bottom to top. Writers record fuel blocks only;
    /// replay also accepts one value per block.
    pub fn enrich_list(&self) -> &[f64] {
        &self.enrich_list
    }

    pub fn assem_type(&self) -> Option<&str> {
        self.assem_type.as_deref()
    }

    pub fn name_at_discharge(&self) -> Option<&str> {
        self.name_at_discharge.as_deref()
    }

    pub fn rotation(&self) -> Option<f64> {
        self.rotation
    }

    /// `from == to`.
    #[must_use]
    pub fn is_self_move(&self) -> bool {
        self.from == self.to
    }
}

// =============================================================================
// SHUFFLE SEQUENCE
// =============================================================================

/// Recorded moves per cycle, in recording order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShuffleSequence {
    cycles: BTreeMap<u32, Vec<MoveRecord>>,
}

impl ShuffleSequence {
    /// Create an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `cycle` exists (possibly with no moves).
    pub fn ensure_cycle(&mut self, cycle: u32) {
        self.cycles.entry(cycle).or_default();
    }

    /// Append a record to a cycle.
    pub fn push(&mut self, cycle: u32, record: MoveRecord) {
        self.cycles.entry(cycle).or_default().push(record);
    }

    /// Replace a cycle's records.
    pub fn set_cycle(&mut self, cycle: u32, records: Vec<MoveRecord>) {
        self.cycles.insert(cycle, records);
    }

    /// Records for `cycle`, or `CycleNotFound`.
    pub fn moves_for(&self, cycle: u32) -> Result<&[MoveRecord], RefuelError> {
        self.cycles
            .get(&cycle)
            .map(Vec::as_slice)
            .ok_or(RefuelError::CycleNotFound(cycle))
    }

    /// Cycles in ascending order.
    pub fn cycles(&self) -> impl Iterator<Item = u32> + '_ {
        self.cycles.keys().copied()
    }

    /// `(cycle, records)` in ascending cycle order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[MoveRecord])> {
        self.cycles.iter().map(|(c, r)| (*c, r.as_slice()))
    }

    /// Number of cycles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    /// True if no cycle is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Check replayability: no cycle 0 and no gaps.
    pub fn validate(&self) -> Result<(), RefuelError> {
        if self.cycles.contains_key(&0) {
            return Err(RefuelError::ReservedCycle);
        }
        let mut expected = None;
        for cycle in self.cycles.keys().copied() {
            if let Some(next) = expected
                && cycle != next
            {
                return Err(RefuelError::MissingCycle(next));
            }
            expected = Some(cycle.saturating_add(1));
        }
        Ok(())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Broad error categories.
///
/// Every class is fail-fast: callers are expected to abandon the outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed shuffle input or settings.
    Configuration,
    /// A referenced assembly, location, pool entry or cycle is absent.
    Lookup,
    /// Stationary-block layouts disagree.
    Integrity,
    /// Chain reconstruction ran past its step bound.
    BoundsExceeded,
    /// File system failure.
    Io,
}

/// Errors that can occur in the Refuel engine.
///
/// - No silent failures
/// - Use `Result<T, RefuelError>` for fallible operations
/// - Moves applied before an error stay applied; nothing is rolled back
#[derive(Debug, Error)]
pub enum RefuelError {
    /// A location label could not be parsed.
    #[error("Invalid location label: {0:?}")]
    InvalidLocation(String),

    /// A legacy shuffle line matched no known format.
    #[error("Unparseable shuffle line {line}: {content:?}")]
    ParseLine { line: usize, content: String },

    /// Structural problem in a shuffle file.
    #[error("Invalid shuffle sequence: {0}")]
    InvalidSequence(String),

    /// An action key other than cascade / misloadSwap / extraRotations.
    #[error("Unknown shuffle action: {0:?}")]
    UnknownAction(String),

    /// Enrichment outside [0, 100].
    #[error("Fuel enrichment {0} is outside [0, 100]")]
    EnrichmentOutOfRange(f64),

    /// Cycle 0 appeared in a replayable sequence.
    #[error("Cycle 0 is reserved for initial loading")]
    ReservedCycle,

    /// Cycle numbers have a gap.
    #[error("Shuffle sequence is missing cycle {0}")]
    MissingCycle(u32),

    /// A location was used twice in one cycle.
    #[error("Location {location} is used more than once in cycle {cycle}")]
    LocationReused { cycle: u32, location: Location },

    /// Ring schedule arguments are inconsistent.
    #[error("Invalid ring schedule: {0}")]
    InvalidSchedule(String),

    /// Settings are inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record set cannot be expressed in the requested format.
    #[error("Cannot serialize shuffle: {0}")]
    Unrepresentable(String),

    /// Assembly id unknown to the core collaborator.
    #[error("Assembly not found: {0}")]
    AssemblyNotFound(AssemblyId),

    /// No assembly sits at a location that should be occupied.
    #[error("No assembly at {0}")]
    EmptyLocation(Location),

    /// A location is already occupied.
    #[error("Location {0} is already occupied")]
    OccupiedLocation(Location),

    /// Assembly exists but is not placed in the core.
    #[error("Assembly {0} is not in the core")]
    NotInCore(AssemblyId),

    /// An assembly to be charged is already placed in the core.
    #[error("Assembly {0} is already in the core")]
    AlreadyInCore(AssemblyId),

    /// A named assembly is missing from the spent fuel pool.
    #[error("Assembly {0:?} is not in the spent fuel pool")]
    NotInSfp(String),

    /// A cycle was requested that the sequence does not hold.
    #[error("Cycle {0} is not present in the shuffle sequence")]
    CycleNotFound(u32),

    /// No template for a fresh assembly type.
    #[error("Unknown assembly type: {0:?}")]
    UnknownAssemblyType(String),

    /// Stationary blocks of two assemblies sit at different axial indices.
    #[error(
        "Stationary blocks of {first} {first_indices:?} and {second} {second_indices:?} do not line up"
    )]
    StationaryMismatch {
        first: AssemblyId,
        second: AssemblyId,
        first_indices: Vec<usize>,
        second_indices: Vec<usize>,
    },

    /// Chain tracking exceeded its step bound.
    #[error("Chain tracking exceeded {limit} steps; partial chain: {partial:?}")]
    ChainBoundsExceeded { limit: usize, partial: Vec<Location> },

    /// No recorded move leads into the chain tail.
    #[error("No move leads into {tail}; partial chain: {partial:?}")]
    BrokenChain {
        tail: Location,
        partial: Vec<Location>,
    },

    /// A location ended up in more than one chain.
    #[error("Location {0} belongs to more than one chain")]
    ChainConflict(Location),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl RefuelError {
    /// Taxonomy class of this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidLocation(_)
            | Self::ParseLine { .. }
            | Self::InvalidSequence(_)
            | Self::UnknownAction(_)
            | Self::EnrichmentOutOfRange(_)
            | Self::ReservedCycle
            | Self::MissingCycle(_)
            | Self::LocationReused { .. }
            | Self::InvalidSchedule(_)
            | Self::Config(_)
            | Self::Unrepresentable(_)
            | Self::BrokenChain { .. }
            | Self::ChainConflict(_) => ErrorClass::Configuration,
            Self::AssemblyNotFound(_)
            | Self::EmptyLocation(_)
            | Self::OccupiedLocation(_)
            | Self::NotInCore(_)
            | Self::AlreadyInCore(_)
            | Self::NotInSfp(_)
            | Self::CycleNotFound(_)
            | Self::UnknownAssemblyType(_) => ErrorClass::Lookup,
            Self::StationaryMismatch { .. } => ErrorClass::Integrity,
            Self::ChainBoundsExceeded { .. } => ErrorClass::BoundsExceeded,
            Self::IoError(_) => ErrorClass::Io,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
