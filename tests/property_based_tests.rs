//! Property-based tests for assessor
//!
//! Verifies the session invariants across random phase schedules and caps:
//! - history grows by exactly one entry per accepted answer and never rewrites
//!   earlier entries
//! - recorded phases never move backwards in the configured order
//! - every session terminates within its question cap and reports at most
//!   `max_questions` entries
//!
//! ## Configuration
//!
//! - `PROPTEST_CASES`: Number of test cases per property (default: 64)
//!
//! ```bash
//! PROPTEST_CASES=256 cargo test --test property_based_tests
//! ```

mod support;

use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use assessor::services::{QuestionResponse, QuestionService};
use assessor::{Answer, AnswerType, HistoryEntry, Persona, QuestionSpec, ServiceError};
use async_trait::async_trait;
use proptest::prelude::*;

use support::{RecordingReports, config, manual_orchestrator};

const DEFAULT_PROPTEST_CASES: u32 = 64;

const ALL_PHASES: [&str; 5] = ["Strategy", "Data", "Technology", "People", "Governance"];

fn proptest_config() -> ProptestConfig {
    let cases = env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES);
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

/// Call `i` ends the current phase when `schedule[i]` is true, otherwise asks
/// a fresh question. Calls past the end of the schedule always ask.
struct ScheduledQuestions {
    schedule: Vec<bool>,
    calls: AtomicUsize,
}

#[async_trait]
impl QuestionService for ScheduledQuestions {
    async fn next_question(
        &self,
        _phase: &str,
        _history: &[HistoryEntry],
    ) -> Result<QuestionResponse, ServiceError> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.schedule.get(i).copied().unwrap_or(false) {
            Ok(QuestionResponse::phase_complete())
        } else {
            Ok(QuestionResponse::asking(format!("question {i}")))
        }
    }
}

struct RunSummary {
    history: Vec<HistoryEntry>,
    phases: Vec<String>,
    completed: bool,
    reported: Vec<usize>,
    submits: usize,
}

fn run_schedule(phase_count: usize, max_questions: usize, schedule: Vec<bool>) -> RunSummary {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let phases = &ALL_PHASES[..phase_count];
        let reports = RecordingReports::ok();
        let orchestrator = manual_orchestrator(
            config(phases, max_questions),
            Arc::new(ScheduledQuestions {
                schedule,
                calls: AtomicUsize::new(0),
            }),
            reports.clone(),
        );
        let handle = orchestrator.start_session(None).await.unwrap();

        let mut submits = 0;
        let mut previous = handle.get_history();
        while !handle.snapshot().is_completed() && submits <= max_questions {
            handle.submit_text(&format!("answer {submits}")).await.unwrap();
            submits += 1;

            let current = handle.get_history();
            assert_eq!(current.len(), previous.len() + 1);
            assert_eq!(&current[..previous.len()], previous.as_slice());
            previous = current;
        }

        RunSummary {
            history: handle.get_history(),
            phases: phases.iter().map(|p| (*p).to_string()).collect(),
            completed: handle.snapshot().is_completed(),
            reported: reports.seen().into_iter().map(|(len, _)| len).collect(),
            submits,
        }
    })
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn prop_history_is_append_only_and_phases_never_go_back(
        phase_count in 1usize..=5,
        max_questions in 1usize..=15,
        schedule in prop::collection::vec(prop::bool::weighted(0.3), 0..40),
    ) {
        let summary = run_schedule(phase_count, max_questions, schedule);

        prop_assert!(summary.completed);
        prop_assert!(summary.submits <= max_questions);
        prop_assert_eq!(summary.history.len(), summary.submits);

        let positions: Vec<usize> = summary
            .history
            .iter()
            .map(|e| summary.phases.iter().position(|p| *p == e.phase).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] <= w[1]));

        prop_assert_eq!(summary.reported.len(), 1);
        prop_assert!(summary.reported[0] <= max_questions);
        prop_assert_eq!(summary.reported[0], summary.history.len());
    }

    #[test]
    fn prop_typed_selections_match_options_in_order(
        (options, picks) in prop::collection::btree_set("[a-z]{1,8}", 1..6)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_flat_map(|options| {
                let len = options.len();
                (Just(options.clone()), prop::sample::subsequence(options, 1..=len))
            }),
    ) {
        let question = QuestionSpec::new(
            "Which apply?",
            AnswerType::MultipleChoice,
            Some(options),
            None,
        )
        .unwrap();
        let typed = picks
            .iter()
            .map(|p| p.to_uppercase())
            .collect::<Vec<_>>()
            .join(", ");

        let answer = Answer::from_text(&typed, &question);

        prop_assert_eq!(answer, Some(Answer::Selections(picks)));
    }

    #[test]
    fn prop_scale_band_is_a_non_empty_slice_of_the_options(
        count in 1usize..=11,
    ) {
        let options: Vec<String> = (1..=count).map(|i| i.to_string()).collect();
        for persona in Persona::ALL {
            let band = persona.profile().scale_band(&options);
            prop_assert!(!band.is_empty());
            prop_assert!(band.iter().all(|b| options.contains(b)));
        }
        let leader = Persona::Leader.profile().scale_band(&options);
        prop_assert_eq!(leader.last(), options.last());
        let explorer = Persona::Explorer.profile().scale_band(&options);
        prop_assert_eq!(explorer.first(), options.first());
    }
}
