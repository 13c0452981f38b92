//! Auto-complete runs against stubbed simulator providers.

mod support;

use std::sync::Arc;
use std::time::Duration;

use assessor::services::QuestionResponse;
use assessor::{
    Answer, AnswerSource, AnswerType, AutoCompleteOutcome, AutoCompleteState, Config,
    DriverError, Persona, SessionError, SubmitOutcome,
};

use support::{
    EndlessQuestions, RecordingReports, ScriptedQuestions, StubLlm, all_done, ask, config,
    orchestrator,
};

const PHASES: [&str; 3] = ["Strategy", "Data", "People"];

fn config_with_steps(max_questions: usize, max_auto_steps: u32) -> Config {
    Config::builder()
        .phases(PHASES)
        .max_questions(max_questions)
        .max_auto_steps(max_auto_steps)
        .build()
        .unwrap()
}

#[tokio::test]
async fn fallback_answers_are_tagged_as_fallback() {
    let primary = StubLlm::failing("primary");
    let fallback = StubLlm::answering("fallback", "Enabler-level answer");
    let reports = RecordingReports::ok();
    let orchestrator = orchestrator(
        config(&PHASES, 4),
        Arc::new(EndlessQuestions::default()),
        reports.clone(),
        primary.clone(),
        fallback.clone(),
    );
    let handle = orchestrator.start_session(None).await.unwrap();

    handle.start_auto_complete(Persona::Enabler).unwrap();
    let outcome = handle.wait_auto_complete().await.unwrap();

    assert_eq!(outcome, AutoCompleteOutcome::Completed { steps: 4 });
    let history = handle.get_history();
    assert_eq!(history.len(), 4);
    for entry in &history {
        assert_eq!(entry.source, AnswerSource::FallbackSimulator);
        assert_eq!(entry.answer, Answer::Text("Enabler-level answer".into()));
    }
    assert_eq!(primary.calls(), 4);
    assert_eq!(fallback.calls(), 4);
    assert_eq!(reports.calls(), 1);
    assert!(handle.get_report().is_some());

    let view = handle.snapshot();
    assert_eq!(view.auto, AutoCompleteState::Completed);
    assert_eq!(view.auto_steps, 4);
}

#[tokio::test]
async fn primary_answers_skip_the_fallback() {
    let primary = StubLlm::answering("primary", "We run quarterly reviews");
    let fallback = StubLlm::answering("fallback", "unused");
    let orchestrator = orchestrator(
        config(&PHASES, 2),
        Arc::new(EndlessQuestions::default()),
        RecordingReports::ok(),
        primary,
        fallback.clone(),
    );
    let handle = orchestrator.start_session(None).await.unwrap();

    handle.start_auto_complete(Persona::Leader).unwrap();
    handle.wait_auto_complete().await.unwrap();

    assert!(
        handle
            .get_history()
            .iter()
            .all(|e| e.source == AnswerSource::PrimarySimulator)
    );
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn exhausted_simulators_stop_without_submitting() {
    let orchestrator = orchestrator(
        config(&PHASES, 20),
        ScriptedQuestions::new([ask("Q1"), ask("Q2")]),
        RecordingReports::ok(),
        StubLlm::failing("primary"),
        StubLlm::failing("fallback"),
    );
    let handle = orchestrator.start_session(None).await.unwrap();

    handle.start_auto_complete(Persona::Explorer).unwrap();
    let outcome = handle.wait_auto_complete().await.unwrap();

    assert_eq!(outcome.steps(), 0);
    assert!(matches!(
        outcome.error(),
        Some(DriverError::SimulatorExhausted { question }) if question == "Q1"
    ));
    let view = handle.snapshot();
    assert_eq!(view.history_len(), 0);
    assert_eq!(view.auto, AutoCompleteState::Failed);
    assert!(view.auto_error.is_some());
    // The manual channel is untouched and still usable.
    assert!(view.error.is_none());
    let outcome = handle.submit_text("typed by hand").await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::NextQuestion(_)));
    assert_eq!(handle.get_history()[0].source, AnswerSource::Manual);
}

#[tokio::test]
async fn step_cap_ends_a_run_before_the_question_cap() {
    let orchestrator = orchestrator(
        config_with_steps(20, 3),
        Arc::new(EndlessQuestions::default()),
        RecordingReports::ok(),
        StubLlm::answering("primary", "answer"),
        StubLlm::failing("fallback"),
    );
    let handle = orchestrator.start_session(None).await.unwrap();

    handle.start_auto_complete(Persona::Enabler).unwrap();
    let outcome = handle.wait_auto_complete().await.unwrap();

    assert_eq!(
        outcome,
        AutoCompleteOutcome::Failed {
            steps: 3,
            error: DriverError::StepCapReached { steps: 3 },
        }
    );
    assert_eq!(handle.snapshot().history_len(), 3);
    assert!(!handle.snapshot().is_completed());

    let outcome = handle.submit_text("typed by hand").await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::NextQuestion(_)));
    assert_eq!(handle.snapshot().history_len(), 4);
}

#[tokio::test]
async fn stop_discards_an_answer_generated_after_the_request() {
    let primary = StubLlm::slow("primary", "late answer", Duration::from_millis(200));
    let orchestrator = orchestrator(
        config(&PHASES, 20),
        Arc::new(EndlessQuestions::default()),
        RecordingReports::ok(),
        primary.clone(),
        StubLlm::failing("fallback"),
    );
    let handle = orchestrator.start_session(None).await.unwrap();

    handle.start_auto_complete(Persona::Leader).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.stop_auto_complete());

    let outcome = handle.wait_auto_complete().await.unwrap();

    assert_eq!(outcome, AutoCompleteOutcome::Stopped { steps: 0 });
    assert_eq!(primary.calls(), 1);
    assert_eq!(handle.snapshot().history_len(), 0);
    assert_eq!(handle.snapshot().auto, AutoCompleteState::Stopped);
    assert!(!handle.stop_auto_complete());
}

#[tokio::test]
async fn manual_submissions_are_rejected_while_running() {
    let orchestrator = orchestrator(
        config(&PHASES, 20),
        Arc::new(EndlessQuestions::default()),
        RecordingReports::ok(),
        StubLlm::slow("primary", "answer", Duration::from_millis(200)),
        StubLlm::failing("fallback"),
    );
    let handle = orchestrator.start_session(None).await.unwrap();

    handle.start_auto_complete(Persona::Enabler).unwrap();

    assert_eq!(
        handle.submit_text("mine").await.unwrap_err(),
        SessionError::SubmitInFlight
    );
    assert_eq!(
        handle.start_auto_complete(Persona::Leader).unwrap_err(),
        DriverError::AlreadyRunning
    );

    handle.stop_auto_complete();
    handle.wait_auto_complete().await.unwrap();
    assert!(handle.submit_text("mine").await.is_ok());
}

#[tokio::test]
async fn auto_complete_continues_after_manual_answers() {
    let orchestrator = orchestrator(
        config(&PHASES, 3),
        Arc::new(EndlessQuestions::default()),
        RecordingReports::ok(),
        StubLlm::answering("primary", "simulated"),
        StubLlm::failing("fallback"),
    );
    let handle = orchestrator.start_session(None).await.unwrap();
    handle.submit_text("typed").await.unwrap();

    handle.start_auto_complete(Persona::Explorer).unwrap();
    let outcome = handle.wait_auto_complete().await.unwrap();

    assert_eq!(outcome, AutoCompleteOutcome::Completed { steps: 2 });
    let sources: Vec<AnswerSource> = handle.get_history().iter().map(|e| e.source).collect();
    assert_eq!(
        sources,
        [
            AnswerSource::Manual,
            AnswerSource::PrimarySimulator,
            AnswerSource::PrimarySimulator
        ]
    );
}

#[tokio::test]
async fn simulated_multiple_choice_is_matched_to_options() {
    let questions = ScriptedQuestions::new([
        Ok(QuestionResponse::asking_with_options(
            "Which capabilities exist today?",
            AnswerType::MultipleChoice,
            ["Dashboards", "Forecasting", "Data catalog"],
        )),
        all_done(),
    ]);
    let orchestrator = orchestrator(
        config(&PHASES, 20),
        questions,
        RecordingReports::ok(),
        StubLlm::answering("primary", "- dashboards\n- data catalog"),
        StubLlm::failing("fallback"),
    );
    let handle = orchestrator.start_session(None).await.unwrap();

    handle.start_auto_complete(Persona::Enabler).unwrap();
    let outcome = handle.wait_auto_complete().await.unwrap();

    assert_eq!(outcome, AutoCompleteOutcome::Completed { steps: 1 });
    assert_eq!(
        handle.get_history()[0].answer,
        Answer::Selections(vec!["Dashboards".into(), "Data catalog".into()])
    );
}

#[tokio::test]
async fn auto_complete_after_completion_is_refused() {
    let orchestrator = orchestrator(
        config(&PHASES, 1),
        ScriptedQuestions::new([ask("Q1")]),
        RecordingReports::ok(),
        StubLlm::answering("primary", "answer"),
        StubLlm::failing("fallback"),
    );
    let handle = orchestrator.start_session(None).await.unwrap();
    handle.submit_text("done").await.unwrap();

    assert_eq!(
        handle.start_auto_complete(Persona::Leader).unwrap_err(),
        DriverError::Session(SessionError::AlreadyCompleted)
    );
    assert!(handle.wait_auto_complete().await.is_none());
}

#[tokio::test]
async fn report_failure_ends_the_run_but_keeps_completion() {
    let reports = RecordingReports::failing_first(1);
    let orchestrator = orchestrator(
        config(&PHASES, 2),
        Arc::new(EndlessQuestions::default()),
        reports.clone(),
        StubLlm::answering("primary", "answer"),
        StubLlm::failing("fallback"),
    );
    let handle = orchestrator.start_session(None).await.unwrap();

    handle.start_auto_complete(Persona::Enabler).unwrap();
    let outcome = handle.wait_auto_complete().await.unwrap();

    assert_eq!(outcome.steps(), 2);
    assert!(matches!(
        outcome.error(),
        Some(DriverError::Session(SessionError::Report(_)))
    ));
    assert!(handle.snapshot().is_completed());
    assert!(handle.get_report().is_none());

    let report = handle.retry_report().await.unwrap();
    assert_eq!(report.history.len(), 2);
    assert_eq!(reports.calls(), 2);
}
