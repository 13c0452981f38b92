//! Command-line interface for assessor
//!
//! This module provides the CLI surface for the assessor binary. The module
//! is split into:
//! - `args`: CLI argument definitions (clap structs)
//! - `commands`: Command handler implementations
//! - `run`: Entry point and dispatch

pub mod args;
mod commands;
mod run;

pub use run::run;
