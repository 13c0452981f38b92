//! Configuration for assessor.
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI arguments > config file > built-in defaults.

mod config;

pub use config::*;
