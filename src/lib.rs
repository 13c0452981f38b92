//! assessor: guided AI assessment orchestrator
//!
//! The library surface re-exports the engine, configuration and error types
//! so embedders depend on one crate. The `assessor` binary lives in [`cli`].
//!
//! # Stable API
//!
//! - [`Orchestrator`] / [`SessionHandle`]: create and drive sessions
//! - [`Config`] / [`CliArgs`]: configuration discovery and overrides
//! - [`AssessError`] / [`ExitCode`]: error reporting and process exit status

pub mod cli;

pub use assessor_config::{CliArgs, Config, ConfigBuilder, ConfigSource, ProviderConfig};
pub use assessor_engine::*;
pub use assessor_utils::error::{AssessError, ConfigError, LlmError, UserFriendlyError};
pub use assessor_utils::exit_codes::ExitCode;
