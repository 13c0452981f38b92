//! `tracing` setup and the few structured events every session emits.
//!
//! Output goes to stderr; stdout carries the interactive transcript.

use tracing::{Level, info, span, warn};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan, prelude::*};

use crate::redaction::redact_error_message;

const QUIET_FILTER: &str = "assessor=info,warn";
const VERBOSE_FILTER: &str = "assessor=debug,info";

/// Install the global subscriber.
///
/// A valid `RUST_LOG` takes precedence over `verbose`. Verbose output adds
/// event targets and a line per closed span with its timing.
///
/// # Errors
///
/// Fails when a global subscriber is already set.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { QUIET_FILTER })
    });
    let span_events = if verbose { FmtSpan::CLOSE } else { FmtSpan::NONE };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_span_events(span_events)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;
    Ok(())
}

/// Entered by the session handle around every operation.
pub fn session_span(session_id: &str, industry: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "assessment_session",
        session_id = %session_id,
        industry = %industry,
    )
}

/// Log a phase transition.
pub fn log_phase_advance(session_id: &str, from: &str, to: &str, history_len: usize) {
    info!(
        session_id = %session_id,
        from_phase = %from,
        to_phase = %to,
        history_len = history_len,
        "Phase finished"
    );
}

pub fn log_completion(session_id: &str, reason: &str, history_len: usize) {
    info!(
        session_id = %session_id,
        reason = %reason,
        history_len = history_len,
        "Assessment completed"
    );
}

/// The error text is redacted before it is logged.
pub fn log_service_failure(session_id: &str, operation: &str, error: &str) {
    let sanitized = redact_error_message(error);
    warn!(
        session_id = %session_id,
        operation = %operation,
        error = %sanitized,
        "Service call failed, session unchanged"
    );
}
