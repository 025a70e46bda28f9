//! # Engine Primitives
//!
//! Hardcoded constants for the Refuel engine.
//!
//! These values are part of the replay contract: changing any of them can make
//! a recorded shuffle replay differently, so they are compiled in rather than
//! configured.

/// Maximum number of backward steps when tracking one chain.
///
/// - Real cascades are far shorter than this.
/// - Exceeding it means the move list is cyclic or malformed.
pub const MAX_CHAIN_STEPS: usize = 100;

/// Tolerance for treating two search distances as equal.
///
/// Applied both relatively and absolutely; ties go to the lower assembly id.
pub const TIE_TOLERANCE: f64 = 1e-8;

/// Inclusive bounds for a fuel enrichment value (percent).
pub const MIN_ENRICHMENT: f64 = 0.0;
pub const MAX_ENRICHMENT: f64 = 100.0;

/// Sentinel label for the charge queue.
pub const LOAD_QUEUE_LABEL: &str = "LoadQueue";

/// Sentinel label for the spent fuel pool.
pub const SFP_LABEL: &str = "SFP";

/// Sentinel label for untracked out-of-core storage.
pub const EX_CORE_LABEL: &str = "ExCore";

/// File name suffix for legacy shuffle history files.
///
/// Full name: `<caseTitle>-SHUFFLES.txt`.
pub const LEGACY_FILE_SUFFIX: &str = "-SHUFFLES.txt";
