//! Auto-complete control loop
//!
//! One step = simulate an answer for the current question, then submit it
//! and wait for the full round-trip. Steps never overlap. The loop ends on
//! completion, a stop request, a simulator failure, any submit error, or the
//! absolute step cap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use assessor_utils::error::{DriverError, SessionError};

use crate::handle::SessionHandle;
use crate::persona::Persona;
use crate::session::{SessionStatus, SubmitOutcome};
use crate::simulator::PersonaAutoAnswerer;

/// Auto-complete state as published in session snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoCompleteState {
    #[default]
    Idle,
    Running,
    Stopped,
    Completed,
    Failed,
}

/// How a run ended. `steps` counts submitted answers.
///
/// `Stopped` is reserved for an explicit stop request. Hitting the
/// `max_auto_steps` guard before the session completes is reported as
/// `Failed` with `DriverError::StepCapReached`, since the run ended without
/// the assessment finishing; the session stays usable for manual answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoCompleteOutcome {
    Completed { steps: u32 },
    Stopped { steps: u32 },
    Failed { steps: u32, error: DriverError },
}

impl AutoCompleteOutcome {
    #[must_use]
    pub fn steps(&self) -> u32 {
        match self {
            Self::Completed { steps } | Self::Stopped { steps } | Self::Failed { steps, .. } => {
                *steps
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> AutoCompleteState {
        match self {
            Self::Completed { .. } => AutoCompleteState::Completed,
            Self::Stopped { .. } => AutoCompleteState::Stopped,
            Self::Failed { .. } => AutoCompleteState::Failed,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&DriverError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

pub(crate) struct AutoCompleteDriver {
    handle: SessionHandle,
    answerer: Arc<PersonaAutoAnswerer>,
    persona: Persona,
    stop: Arc<AtomicBool>,
    max_steps: u32,
}

impl AutoCompleteDriver {
    pub(crate) fn new(
        handle: SessionHandle,
        answerer: Arc<PersonaAutoAnswerer>,
        persona: Persona,
        stop: Arc<AtomicBool>,
        max_steps: u32,
    ) -> Self {
        Self {
            handle,
            answerer,
            persona,
            stop,
            max_steps,
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub(crate) async fn run(self) -> AutoCompleteOutcome {
        info!(
            session_id = %self.handle.id(),
            persona = %self.persona,
            max_steps = self.max_steps,
            "Auto-complete started"
        );
        let outcome = self.run_steps().await;
        match &outcome {
            AutoCompleteOutcome::Failed { steps, error } => warn!(
                session_id = %self.handle.id(),
                steps,
                error = %error,
                "Auto-complete failed"
            ),
            other => info!(
                session_id = %self.handle.id(),
                steps = other.steps(),
                state = ?other.state(),
                "Auto-complete finished"
            ),
        }
        self.handle.finish_auto(&outcome);
        outcome
    }

    async fn run_steps(&self) -> AutoCompleteOutcome {
        let mut steps: u32 = 0;

        loop {
            if self.stopped() {
                return AutoCompleteOutcome::Stopped { steps };
            }

            let view = self.handle.snapshot();
            if view.status == SessionStatus::Completed
                || view.history.len() >= self.handle.max_questions()
            {
                return AutoCompleteOutcome::Completed { steps };
            }
            if steps >= self.max_steps {
                return AutoCompleteOutcome::Failed {
                    steps,
                    error: DriverError::StepCapReached { steps },
                };
            }

            let Some(question) = view.question.clone() else {
                let error = if view.pending_fetch {
                    SessionError::FetchPending
                } else {
                    SessionError::NoCurrentQuestion
                };
                return AutoCompleteOutcome::Failed {
                    steps,
                    error: DriverError::Session(error),
                };
            };
            if view.pending_fetch {
                return AutoCompleteOutcome::Failed {
                    steps,
                    error: DriverError::Session(SessionError::FetchPending),
                };
            }

            let simulated = self
                .answerer
                .generate(self.handle.id(), &question, self.persona)
                .await;

            let answer = match simulated.to_answer(&question) {
                Some(answer) if !simulated.source.halts_driver() => answer,
                _ => {
                    return AutoCompleteOutcome::Failed {
                        steps,
                        error: DriverError::SimulatorExhausted {
                            question: question.text.clone(),
                        },
                    };
                }
            };

            // A stop that arrived while the providers were working discards
            // the generated answer.
            if self.stopped() {
                debug!(session_id = %self.handle.id(), "Discarding answer generated after stop");
                return AutoCompleteOutcome::Stopped { steps };
            }

            match self
                .handle
                .submit_for_driver(&question.text, answer, simulated.source)
                .await
            {
                Ok(SubmitOutcome::NextQuestion(_)) => {
                    steps += 1;
                    self.handle.record_auto_step(steps);
                }
                Ok(SubmitOutcome::Completed { .. }) => {
                    steps += 1;
                    self.handle.record_auto_step(steps);
                    return AutoCompleteOutcome::Completed { steps };
                }
                Err(error) => {
                    // The answer may already be recorded (fetch or report
                    // failure after the append); count it if so.
                    let recorded = self.handle.snapshot().history.len() > view.history.len();
                    if recorded {
                        steps += 1;
                        self.handle.record_auto_step(steps);
                    }
                    return AutoCompleteOutcome::Failed {
                        steps,
                        error: DriverError::Session(error),
                    };
                }
            }
        }
    }
}
