//! # refuel-core
//!
//! The deterministic fuel-shuffle engine for Refuel.
//!
//! This crate decides, records, validates and replays the movement of fuel
//! assemblies between reactor-core positions, the charge queue and the spent
//! fuel pool during a refueling outage.
//!
//! ## Layers
//!
//! - `search`, `swap`, `schedule`: the shuffle primitives a strategy uses
//! - `outage`, `logic`: one outage session and the built-in strategy
//! - `formats`, `chain`, `replay`: shuffle history on disk and its replay
//! - `reactor`: the core-model collaborator the engine drives
//!
//! ## Architectural Constraints
//!
//! - Single-threaded and synchronous; an outage holds `&mut` on the core model
//! - Deterministic: ordered collections only, ties broken by assembly id
//! - Fail fast: every operation returns `Result`, nothing is rolled back
//! - No network, no async; file I/O only in `formats` helpers

// =============================================================================
// MODULES
// =============================================================================

pub mod chain;
pub mod config;
pub mod formats;
pub mod logic;
pub mod outage;
pub mod primitives;
pub mod reactor;
pub mod replay;
pub mod schedule;
pub mod search;
pub mod swap;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Assembly, AssemblyId, Block, ErrorClass, Flags, Location, MoveRecord, RefuelError,
    ShuffleSequence, TypeFilter,
};

// =============================================================================
// RE-EXPORTS: Shuffle Engine
// =============================================================================

pub use chain::{ChargeDescriptor, LoadChain, ProcessedMoves, process_move_list, track_chain};
pub use config::{ScheduleSettings, ShuffleSettings};
pub use logic::ScheduledShuffle;
pub use outage::{FuelHandler, OutagePlan, OutageReport, ShuffleLogic};
pub use reactor::{Core, CoreStore};
pub use replay::do_repeat_shuffle;
pub use schedule::{RingSchedule, build_convergent_ring_schedule, build_ring_schedule};
pub use search::{AssemblyQuery, Bound, ParamBound, Reference, Side, find_assemblies, find_assembly};
pub use swap::{MovedLedger, SwapExecutor};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    ShuffleFormat, legacy_file_name, parse_legacy, parse_yaml, read_path, write_legacy,
    write_legacy_file, write_yaml, write_yaml_file,
};
