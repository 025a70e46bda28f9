//! # Refuel CLI Module
//!
//! This module implements the CLI interface for Refuel.
//!
//! ## Available Commands
//!
//! - `convert` - Convert a shuffle history between legacy text and YAML
//! - `chains` - Print the reconstructed chains of one cycle
//! - `schedule` - Print the ring schedule of the built-in strategy
//! - `check` - Load and validate a shuffle file

mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use refuel_core::RefuelError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Refuel - Fuel-Shuffle History Tool
///
/// Records, converts and reconstructs the assembly moves of refueling outages.
#[derive(Parser, Debug)]
#[command(name = "refuel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML settings file
    #[arg(short = 'S', long, global = true)]
    pub settings: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a shuffle history between formats (chosen by extension)
    Convert {
        /// Input shuffle file (.yaml/.yml or legacy text)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file; defaults to the other format next to the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the load chains, loop chains and rotations of one cycle
    Chains {
        /// Shuffle file; defaults to `explicit_repeat_shuffles` from settings
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Cycle number
        #[arg(short, long)]
        cycle: u32,
    },

    /// Print a ring schedule
    Schedule {
        /// Outermost ring of the core
        #[arg(long)]
        max_ring: Option<u32>,

        /// Ring fresh assemblies are charged into
        #[arg(long)]
        charge: Option<u32>,

        /// Ring assemblies are discharged from
        #[arg(long)]
        discharge: Option<u32>,

        /// Ring where the visiting order jumps
        #[arg(long)]
        jump_from: Option<u32>,

        /// Ring the jump lands on
        #[arg(long)]
        jump_to: Option<u32>,

        /// Fraction of rings to skip, in [0, 1)
        #[arg(long)]
        coarse: Option<f64>,

        /// Use the sorted convergent variant
        #[arg(long)]
        convergent: bool,
    },

    /// Load a shuffle file, rebuild every cycle's chains and report counts
    Check {
        /// Shuffle file; defaults to `explicit_repeat_shuffles` from settings
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), RefuelError> {
    let settings = load_settings(cli.settings.as_deref())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Convert { input, output }) => {
            cmd_convert(&settings, json_mode, &input, output.as_deref())
        }
        Some(Commands::Chains { file, cycle }) => {
            let file = resolve_shuffle_file(file, &settings)?;
            cmd_chains(json_mode, &file, cycle)
        }
        Some(Commands::Schedule {
            max_ring,
            charge,
            discharge,
            jump_from,
            jump_to,
            coarse,
            convergent,
        }) => {
            let overrides = ScheduleOverrides {
                max_ring,
                charge_ring: charge,
                discharge_ring: discharge,
                jump_ring_from: jump_from,
                jump_ring_to: jump_to,
                coarse_factor: coarse,
            };
            cmd_schedule(&settings, json_mode, &overrides, convergent)
        }
        Some(Commands::Check { file }) => {
            let file = resolve_shuffle_file(file, &settings)?;
            cmd_check(json_mode, &file)
        }
        None => Cli::command()
            .print_help()
            .map_err(|e| RefuelError::IoError(e.to_string())),
    }
}
