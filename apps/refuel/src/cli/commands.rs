//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use refuel_core::{
    Location, ProcessedMoves, RefuelError, RingSchedule, ShuffleFormat, ShuffleSequence,
    ShuffleSettings, build_convergent_ring_schedule, process_move_list, read_path,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a shuffle history file (64 MB).
const MAX_SHUFFLE_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Maximum size of a settings file (1 MB).
const MAX_SETTINGS_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), RefuelError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| RefuelError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(RefuelError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, RefuelError> {
    let canonical = path.canonicalize().map_err(|e| {
        RefuelError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(RefuelError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, RefuelError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        RefuelError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(RefuelError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| RefuelError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Load and validate settings from a TOML file, or use defaults.
pub fn load_settings(path: Option<&Path>) -> Result<ShuffleSettings, RefuelError> {
    let Some(path) = path else {
        return Ok(ShuffleSettings::default());
    };

    let canonical = validate_file_path(path)?;
    validate_file_size(&canonical, MAX_SETTINGS_FILE_SIZE)?;
    let text = std::fs::read_to_string(&canonical)
        .map_err(|e| RefuelError::IoError(format!("{}: {}", path.display(), e)))?;
    let settings: ShuffleSettings = toml::from_str(&text)
        .map_err(|e| RefuelError::Config(format!("{}: {}", path.display(), e)))?;
    settings.validate()?;

    debug!(path = %path.display(), case_title = %settings.case_title, "loaded settings");
    Ok(settings)
}

/// The shuffle file to read: the argument if given, else the settings entry.
pub fn resolve_shuffle_file(
    file: Option<PathBuf>,
    settings: &ShuffleSettings,
) -> Result<PathBuf, RefuelError> {
    file.or_else(|| settings.explicit_repeat_shuffles.clone())
        .ok_or_else(|| {
            RefuelError::Config(
                "no shuffle file given and explicit_repeat_shuffles is not set".to_string(),
            )
        })
}

fn load_sequence(path: &Path) -> Result<ShuffleSequence, RefuelError> {
    let canonical = validate_file_path(path)?;
    validate_file_size(&canonical, MAX_SHUFFLE_FILE_SIZE)?;
    read_path(&canonical)
}

// =============================================================================
// CONVERT COMMAND
// =============================================================================

/// Where `convert` writes when no output is given.
///
/// YAML input becomes the case's legacy history next to it; legacy input
/// becomes a `.yaml` file of the same stem.
pub fn default_output_path(settings: &ShuffleSettings, input: &Path) -> PathBuf {
    match ShuffleFormat::from_path(input) {
        ShuffleFormat::Yaml => {
            let dir = input.parent().unwrap_or(Path::new(""));
            settings.legacy_history_path(dir)
        }
        ShuffleFormat::Legacy => input.with_extension("yaml"),
    }
}

/// Convert a shuffle history between formats.
pub fn cmd_convert(
    settings: &ShuffleSettings,
    json_mode: bool,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), RefuelError> {
    let sequence = load_sequence(input)?;
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(settings, input),
    };
    let output = validate_output_path(&output)?;
    let format = ShuffleFormat::from_path(&output);

    let text = format.render(&sequence)?;
    std::fs::write(&output, text)
        .map_err(|e| RefuelError::IoError(format!("{}: {}", output.display(), e)))?;
    info!(
        output = %output.display(),
        ?format,
        cycles = sequence.len(),
        "converted shuffle history"
    );

    if json_mode {
        print_json(&serde_json::json!({
            "input": input.to_string_lossy(),
            "output": output.to_string_lossy(),
            "format": format!("{:?}", format),
            "cycles": sequence.len()
        }));
        return Ok(());
    }

    println!("Converted {} cycles", sequence.len());
    println!("  From: {}", input.display());
    println!("  To:   {} ({:?})", output.display(), format);
    Ok(())
}

// =============================================================================
// CHAINS COMMAND
// =============================================================================

fn chains_json(cycle: u32, processed: &ProcessedMoves) -> serde_json::Value {
    let load_chains: Vec<serde_json::Value> = processed
        .load_chains
        .iter()
        .map(|chain| {
            serde_json::json!({
                "charge_from": chain.charge.source,
                "assembly_type": chain.charge.assem_type,
                "load_name": chain.charge.load_name,
                "enrichment": chain.charge.enrich_list,
                "locations": chain.locations,
                "discharge_to": chain.discharge_to
            })
        })
        .collect();

    serde_json::json!({
        "cycle": cycle,
        "load_chains": load_chains,
        "loop_chains": processed.loop_chains,
        "rotations": processed.rotations
    })
}

fn join_locations<'a>(locations: impl IntoIterator<Item = &'a Location>) -> String {
    locations
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Print the chains reconstructed from one cycle.
pub fn cmd_chains(json_mode: bool, file: &Path, cycle: u32) -> Result<(), RefuelError> {
    let sequence = load_sequence(file)?;
    let processed = process_move_list(sequence.moves_for(cycle)?)?;

    if json_mode {
        print_json(&chains_json(cycle, &processed));
        return Ok(());
    }

    println!("Cycle {} Chains", cycle);
    println!("================");
    println!();
    println!("Load chains: {}", processed.load_chains.len());
    for chain in &processed.load_chains {
        let charge = match (&chain.charge.load_name, &chain.charge.assem_type) {
            (Some(name), _) => format!("{} from {}", name, chain.charge.source),
            (None, Some(kind)) => format!("{} from {}", kind, chain.charge.source),
            (None, None) => format!("? from {}", chain.charge.source),
        };
        println!(
            "  [{}] {} -> {}",
            charge,
            join_locations(&chain.locations),
            chain.discharge_to
        );
    }
    println!("Loop chains: {}", processed.loop_chains.len());
    for chain in &processed.loop_chains {
        println!("  {} -> {}", join_locations(chain), join_locations(chain.first()));
    }
    println!("Rotations:   {}", processed.rotations.len());
    for (location, radians) in &processed.rotations {
        println!("  {} by {:.4} rad", location, radians);
    }

    Ok(())
}

// =============================================================================
// SCHEDULE COMMAND
// =============================================================================

/// Command-line values that override the `[schedule]` settings table.
#[derive(Debug, Clone, Default)]
pub struct ScheduleOverrides {
    pub max_ring: Option<u32>,
    pub charge_ring: Option<u32>,
    pub discharge_ring: Option<u32>,
    pub jump_ring_from: Option<u32>,
    pub jump_ring_to: Option<u32>,
    pub coarse_factor: Option<f64>,
}

/// Merge settings and overrides into a ring schedule.
pub fn resolve_schedule(
    settings: &ShuffleSettings,
    overrides: &ScheduleOverrides,
    convergent: bool,
) -> Result<RingSchedule, RefuelError> {
    let mut schedule = settings.schedule.clone().unwrap_or_default();
    if let Some(max_ring) = overrides.max_ring {
        schedule.max_ring = max_ring;
    }
    if overrides.charge_ring.is_some() {
        schedule.charge_ring = overrides.charge_ring;
    }
    if overrides.discharge_ring.is_some() {
        schedule.discharge_ring = overrides.discharge_ring;
    }
    if overrides.jump_ring_from.is_some() {
        schedule.jump_ring_from = overrides.jump_ring_from;
    }
    if overrides.jump_ring_to.is_some() {
        schedule.jump_ring_to = overrides.jump_ring_to;
    }
    if let Some(coarse) = overrides.coarse_factor {
        schedule.coarse_factor = coarse;
    }
    schedule.validate()?;

    if convergent {
        build_convergent_ring_schedule(
            schedule.charge_ring.unwrap_or(schedule.max_ring),
            schedule.discharge_ring.unwrap_or(1),
            schedule.coarse_factor,
        )
    } else {
        schedule.ring_schedule()
    }
}

/// Print a ring schedule.
pub fn cmd_schedule(
    settings: &ShuffleSettings,
    json_mode: bool,
    overrides: &ScheduleOverrides,
    convergent: bool,
) -> Result<(), RefuelError> {
    let schedule = resolve_schedule(settings, overrides, convergent)?;

    if json_mode {
        print_json(&serde_json::to_value(&schedule).unwrap_or_default());
        return Ok(());
    }

    println!("Ring Schedule ({} steps)", schedule.len());
    println!("=======================");
    println!("{:>6} {:>6}", "ring", "width");
    for (ring, width) in schedule.iter() {
        println!("{:>6} {:>6}", ring, width);
    }
    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Per-cycle summary reported by `check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub cycle: u32,
    pub moves: usize,
    pub load_chains: usize,
    pub loop_chains: usize,
    pub rotations: usize,
}

/// Parse a file and rebuild every cycle's chains.
pub fn summarize(sequence: &ShuffleSequence) -> Result<Vec<CycleSummary>, RefuelError> {
    sequence
        .iter()
        .map(|(cycle, moves)| {
            let processed = process_move_list(moves)?;
            Ok(CycleSummary {
                cycle,
                moves: moves.len(),
                load_chains: processed.load_chains.len(),
                loop_chains: processed.loop_chains.len(),
                rotations: processed.rotations.len(),
            })
        })
        .collect()
}

/// Validate a shuffle file and report per-cycle counts.
pub fn cmd_check(json_mode: bool, file: &Path) -> Result<(), RefuelError> {
    let sequence = load_sequence(file)?;
    let summaries = summarize(&sequence)?;
    let format = ShuffleFormat::from_path(file);

    if json_mode {
        print_json(&serde_json::json!({
            "file": file.to_string_lossy(),
            "format": format!("{:?}", format),
            "cycles": summaries
        }));
        return Ok(());
    }

    println!("Shuffle File Check");
    println!("==================");
    println!("File:   {}", file.display());
    println!("Format: {:?}", format);
    println!();
    for summary in &summaries {
        println!(
            "Cycle {:>3}: {:>4} moves, {} load chains, {} loop chains, {} rotations",
            summary.cycle,
            summary.moves,
            summary.load_chains,
            summary.loop_chains,
            summary.rotations
        );
    }
    println!();
    println!("OK ({} cycles)", summaries.len());
    Ok(())
}
