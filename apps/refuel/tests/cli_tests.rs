//! Integration tests for the Refuel CLI commands.
//!
//! Commands run against files in a temporary directory.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use refuel::cli::{
    Cli, Commands, CycleSummary, ScheduleOverrides, cmd_chains, cmd_check, cmd_convert,
    default_output_path, execute, load_settings, resolve_schedule, resolve_shuffle_file,
    summarize,
};
use refuel_core::{RefuelError, ShuffleSettings, read_path};
use std::path::{Path, PathBuf};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

const LEGACY: &str = "\
Before cycle 1:
LoadQueue moved to 001-001 with assembly type feed fuel with enrich list: 4.5 5.5
001-001 moved to 002-001 with assembly type feed fuel with enrich list: 3.1 3.2
002-001 moved to SFP with assembly type feed fuel with enrich list: 2.0 2.1

Before cycle 2:
003-001 moved to 003-002 with assembly type feed fuel with enrich list: 1.0
003-002 moved to 003-001 with assembly type feed fuel with enrich list: 1.0
";

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn test_parse_schedule_arguments() {
    let cli = Cli::try_parse_from([
        "refuel",
        "--json-mode",
        "schedule",
        "--max-ring",
        "10",
        "--coarse",
        "0.5",
    ])
    .unwrap();

    assert!(cli.json_mode);
    match cli.command {
        Some(Commands::Schedule {
            max_ring, coarse, ..
        }) => {
            assert_eq!(max_ring, Some(10));
            assert_eq!(coarse, Some(0.5));
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_parse_requires_cycle_for_chains() {
    assert!(Cli::try_parse_from(["refuel", "chains", "-f", "a.yaml"]).is_err());
}

// =============================================================================
// SETTINGS
// =============================================================================

#[test]
fn test_settings_default_without_file() {
    assert_eq!(load_settings(None).unwrap(), ShuffleSettings::default());
}

#[test]
fn test_settings_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "refuel.toml",
        r#"
case_title = "c7"
explicit_repeat_shuffles = "moves.yaml"

[schedule]
max_ring = 9
coarse_factor = 0.5
param = "burnup"
"#,
    );

    let settings = load_settings(Some(&path)).unwrap();
    assert_eq!(settings.case_title, "c7");
    assert_eq!(settings.stationary_block_flags, vec!["grid plate".to_string()]);
    let schedule = settings.schedule.as_ref().unwrap();
    assert_eq!(schedule.max_ring, 9);
    assert_eq!(schedule.param.as_deref(), Some("burnup"));
    assert_eq!(
        resolve_shuffle_file(None, &settings).unwrap(),
        PathBuf::from("moves.yaml")
    );
}

#[test]
fn test_settings_reject_unknown_and_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let unknown = write(dir.path(), "unknown.toml", "case_tittle = \"x\"\n");
    assert!(matches!(
        load_settings(Some(&unknown)),
        Err(RefuelError::Config(_))
    ));

    let invalid = write(
        dir.path(),
        "invalid.toml",
        "[schedule]\nmax_ring = 5\ncoarse_factor = 1.5\n",
    );
    assert!(matches!(
        load_settings(Some(&invalid)),
        Err(RefuelError::Config(_))
    ));

    assert!(matches!(
        load_settings(Some(&dir.path().join("missing.toml"))),
        Err(RefuelError::IoError(_))
    ));
}

#[test]
fn test_missing_shuffle_file_is_config_error() {
    let result = resolve_shuffle_file(None, &ShuffleSettings::default());
    assert!(matches!(result, Err(RefuelError::Config(_))));
}

// =============================================================================
// SCHEDULE COMMAND
// =============================================================================

#[test]
fn test_schedule_flags_override_settings() {
    let mut settings = ShuffleSettings::default();
    settings.schedule = Some(refuel_core::ScheduleSettings {
        max_ring: 10,
        ..Default::default()
    });

    let plain = resolve_schedule(&settings, &ScheduleOverrides::default(), false).unwrap();
    assert_eq!(plain.rings, (1..=10).collect::<Vec<_>>());

    let coarse = ScheduleOverrides {
        coarse_factor: Some(0.5),
        ..Default::default()
    };
    let sampled = resolve_schedule(&settings, &coarse, false).unwrap();
    assert_eq!(sampled.rings, vec![1, 3, 5, 7, 10]);
    assert_eq!(sampled.widths, vec![1, 1, 1, 2, 0]);
}

#[test]
fn test_schedule_convergent_variant() {
    let overrides = ScheduleOverrides {
        max_ring: Some(9),
        coarse_factor: Some(0.5),
        ..Default::default()
    };
    let schedule = resolve_schedule(&ShuffleSettings::default(), &overrides, true).unwrap();
    assert_eq!(schedule.rings, vec![1, 3, 5, 7, 9]);
    assert_eq!(schedule.widths, vec![2, 2, 2, 2, 1]);
}

#[test]
fn test_schedule_rejects_zero_ring() {
    let overrides = ScheduleOverrides {
        max_ring: Some(5),
        charge_ring: Some(0),
        ..Default::default()
    };
    let result = resolve_schedule(&ShuffleSettings::default(), &overrides, false);
    assert!(matches!(result, Err(RefuelError::Config(_))));
}

#[test]
fn test_schedule_ignores_search_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "refuel.toml",
        r#"
[schedule]
max_ring = 6
assembly_type = "feed fuel"
assembly_flags = ["fuel"]
param = "burnup"
compare_to = 60.0
"#,
    );

    let settings = load_settings(Some(&path)).unwrap();
    let schedule = settings.schedule.as_ref().unwrap();
    schedule.strategy().unwrap();

    let resolved = resolve_schedule(&settings, &ScheduleOverrides::default(), false).unwrap();
    assert_eq!(resolved, schedule.ring_schedule().unwrap());
    assert_eq!(resolved.rings, (1..=6).collect::<Vec<_>>());
}

// =============================================================================
// CONVERT COMMAND
// =============================================================================

#[test]
fn test_convert_legacy_to_yaml_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let settings = ShuffleSettings {
        case_title: "c7".to_string(),
        ..ShuffleSettings::default()
    };
    let legacy = write(dir.path(), "input-SHUFFLES.txt", LEGACY);

    cmd_convert(&settings, true, &legacy, None).unwrap();
    let yaml = dir.path().join("input-SHUFFLES.yaml");
    assert_eq!(default_output_path(&settings, &legacy), yaml);
    assert!(yaml.is_file());

    cmd_convert(&settings, false, &yaml, None).unwrap();
    let history = dir.path().join("c7-SHUFFLES.txt");
    assert!(history.is_file());

    let original = read_path(&legacy).unwrap();
    let converted = read_path(&history).unwrap();
    assert_eq!(converted.len(), original.len());
    assert_eq!(
        converted.moves_for(1).unwrap().len(),
        original.moves_for(1).unwrap().len()
    );
}

#[test]
fn test_convert_rejects_missing_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = write(dir.path(), "input-SHUFFLES.txt", LEGACY);
    let output = dir.path().join("nope").join("out.yaml");

    let result = cmd_convert(&ShuffleSettings::default(), true, &legacy, Some(&output));
    assert!(matches!(result, Err(RefuelError::IoError(_))));
}

// =============================================================================
// CHAINS AND CHECK COMMANDS
// =============================================================================

#[test]
fn test_check_summarizes_each_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = write(dir.path(), "case-SHUFFLES.txt", LEGACY);

    cmd_check(true, &legacy).unwrap();
    let summaries = summarize(&read_path(&legacy).unwrap()).unwrap();
    assert_eq!(
        summaries,
        vec![
            CycleSummary {
                cycle: 1,
                moves: 3,
                load_chains: 1,
                loop_chains: 0,
                rotations: 0,
            },
            CycleSummary {
                cycle: 2,
                moves: 2,
                load_chains: 0,
                loop_chains: 1,
                rotations: 0,
            },
        ]
    );
}

#[test]
fn test_check_reports_broken_history() {
    let dir = tempfile::tempdir().unwrap();
    let broken = write(
        dir.path(),
        "broken.yaml",
        "sequence:\n  1: []\n  3: []\n",
    );
    assert!(matches!(
        cmd_check(false, &broken),
        Err(RefuelError::MissingCycle(2))
    ));
}

#[test]
fn test_chains_for_recorded_and_absent_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = write(dir.path(), "case-SHUFFLES.txt", LEGACY);

    cmd_chains(false, &legacy, 1).unwrap();
    cmd_chains(true, &legacy, 2).unwrap();
    assert!(matches!(
        cmd_chains(false, &legacy, 3),
        Err(RefuelError::CycleNotFound(3))
    ));
}

#[test]
fn test_execute_uses_settings_file_for_check() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = write(dir.path(), "case-SHUFFLES.txt", LEGACY);
    let settings = write(
        dir.path(),
        "refuel.toml",
        &format!(
            "explicit_repeat_shuffles = {:?}\n",
            legacy.to_string_lossy()
        ),
    );

    let cli = Cli::try_parse_from([
        "refuel".to_string(),
        "--quiet".to_string(),
        "--settings".to_string(),
        settings.to_string_lossy().into_owned(),
        "check".to_string(),
    ])
    .unwrap();
    execute(cli).unwrap();
}
