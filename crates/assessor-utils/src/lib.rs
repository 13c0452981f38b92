//! Foundation utilities shared by every assessor crate.

pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod redaction;
