//! # refuel
//!
//! Command-line front end for the refuel-core shuffle engine.

pub mod cli;
