//! CLI command implementations for herakles-pulse.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Metric source and configuration validation
//! - `config`: Configuration file generation
//! - `test`: Sampling dry run

pub mod check;
pub mod config;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use test::command_test;
