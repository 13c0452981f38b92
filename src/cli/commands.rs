//! Command handlers for the `assessor` binary.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use assessor_config::Config;
use assessor_engine::{
    AnswerType, AutoCompleteOutcome, HistoryEntry, Orchestrator, Persona, QuestionSpec,
    SessionHandle, SessionView,
};
use assessor_utils::error::{AssessError, SessionError};
use assessor_utils::exit_codes::ExitCode;

type InputLines = Lines<BufReader<Stdin>>;

/// `assessor config`
pub(super) fn show_config(config: &Config, json: bool) -> Result<ExitCode> {
    let effective = config.effective_config();

    if json {
        let map: serde_json::Map<String, serde_json::Value> = effective
            .into_iter()
            .map(|(key, (value, source))| {
                (key, serde_json::json!({ "value": value, "source": source }))
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Effective configuration:");
    let width = effective.keys().map(String::len).max().unwrap_or(0);
    for (key, (value, source)) in &effective {
        println!("  {key:<width$} = {value} ({source})");
    }
    Ok(ExitCode::SUCCESS)
}

/// `assessor personas`
pub(super) fn list_personas() -> Result<ExitCode> {
    println!("{:<10} {:<7} {:<10} VOICE", "PERSONA", "SCALE", "SELECTIONS");
    for persona in Persona::ALL {
        let profile = persona.profile();
        println!(
            "{:<10} {:<7} {:<10} {}",
            persona.as_str(),
            format!("{}-{}", profile.scale_range.0, profile.scale_range.1),
            format!("{}-{}", profile.selection_range.0, profile.selection_range.1),
            profile.vocabulary
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// `assessor run`: answer on stdin until the assessment completes.
pub(super) async fn run_interactive(
    config: Config,
    out: Option<PathBuf>,
    history_json: Option<PathBuf>,
) -> Result<ExitCode> {
    let handle = open_session(config).await?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut shown_phase: Option<usize> = None;

    loop {
        let view = handle.snapshot();
        if view.is_completed() {
            break;
        }

        if view.pending_fetch {
            eprintln!(
                "✗ {}",
                view.error
                    .as_deref()
                    .unwrap_or("the next question could not be loaded")
            );
            if !confirm(&mut input, "Retry loading the next question? [Y/n] ").await? {
                write_history(&handle, history_json.as_deref())?;
                return Ok(ExitCode::SERVICE_FAILURE);
            }
            if let Err(err) = handle.retry().await {
                settle_submit_error(err)?;
            }
            continue;
        }

        let Some(question) = view.question.as_ref() else {
            return Err(AssessError::Session(SessionError::NoCurrentQuestion).into());
        };
        if shown_phase != Some(view.phase_index) {
            print_phase_header(&view);
            shown_phase = Some(view.phase_index);
        }
        print_question(view.history_len() + 1, question);

        let Some(line) = prompt(&mut input, "> ").await? else {
            eprintln!(
                "Input closed; {} answer(s) recorded, assessment not finished.",
                view.history_len()
            );
            write_history(&handle, history_json.as_deref())?;
            return Ok(ExitCode::INTERRUPTED);
        };

        let text = expand_option_numbers(&line, question);
        match handle.submit_text(&text).await {
            Ok(_) => {}
            Err(SessionError::EmptyAnswer) => eprintln!("Please enter an answer."),
            Err(err) => settle_submit_error(err)?,
        }
    }

    let view = handle.snapshot();
    if let Some(reason) = view.completion {
        eprintln!(
            "✓ Assessment complete: {reason} ({} answers)",
            view.history_len()
        );
    }

    while handle.get_report().is_none() {
        eprintln!(
            "✗ {}",
            handle
                .snapshot()
                .error
                .as_deref()
                .unwrap_or("the report could not be generated")
        );
        if !confirm(&mut input, "Retry report generation? [Y/n] ").await? {
            write_history(&handle, history_json.as_deref())?;
            return Ok(ExitCode::SERVICE_FAILURE);
        }
        if let Err(err) = handle.retry_report().await {
            settle_submit_error(err)?;
        }
    }

    deliver(&handle, out.as_deref(), history_json.as_deref())
}

/// `assessor auto`: let `persona` answer until completion, failure or Ctrl-C.
pub(super) async fn run_auto(
    config: Config,
    persona: Persona,
    out: Option<PathBuf>,
    history_json: Option<PathBuf>,
) -> Result<ExitCode> {
    let handle = open_session(config).await?;

    let first = handle.snapshot();
    if first.pending_fetch && !first.is_completed() {
        // One retry before giving up on the very first question.
        if let Err(err) = handle.retry().await {
            write_history(&handle, history_json.as_deref())?;
            return Err(AssessError::Session(err).into());
        }
    }

    handle
        .start_auto_complete(persona)
        .map_err(AssessError::from)?;
    eprintln!("Auto-completing as {persona} (Ctrl-C to stop)...");

    let outcome = follow_auto_complete(&handle).await;
    let Some(outcome) = outcome else {
        return Err(anyhow!("auto-complete task ended unexpectedly"));
    };

    match outcome {
        AutoCompleteOutcome::Completed { steps } => {
            eprintln!("✓ Auto-complete finished after {steps} step(s)");
            if handle.get_report().is_none() {
                // One retry before reporting the failure.
                if let Err(err) = handle.retry_report().await {
                    write_history(&handle, history_json.as_deref())?;
                    return Err(AssessError::Session(err).into());
                }
            }
            deliver(&handle, out.as_deref(), history_json.as_deref())
        }
        AutoCompleteOutcome::Stopped { steps } => {
            eprintln!("Stopped after {steps} step(s); answers so far are kept.");
            write_history(&handle, history_json.as_deref())?;
            Ok(ExitCode::INTERRUPTED)
        }
        AutoCompleteOutcome::Failed { steps, error } => {
            eprintln!("✗ Auto-complete failed after {steps} step(s)");
            write_history(&handle, history_json.as_deref())?;
            Err(AssessError::Driver(error).into())
        }
    }
}

async fn open_session(config: Config) -> Result<SessionHandle> {
    let orchestrator = Orchestrator::from_config(config).map_err(AssessError::from)?;
    let handle = orchestrator
        .start_session(None)
        .await
        .map_err(AssessError::from)?;
    let view = handle.snapshot();
    eprintln!(
        "Session {} ({} industry, {} phases)",
        view.session_id, view.industry, view.phase_count
    );
    Ok(handle)
}

/// Print each newly recorded answer until the auto-complete run ends.
/// The first Ctrl-C asks the run to stop after the current step.
async fn follow_auto_complete(handle: &SessionHandle) -> Option<AutoCompleteOutcome> {
    let mut updates = handle.watch();
    let mut printed = handle.snapshot().history_len();
    let mut interrupted = false;
    let mut watching = true;

    let wait = handle.wait_auto_complete();
    tokio::pin!(wait);

    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome,
            changed = updates.changed(), if watching => {
                if changed.is_err() {
                    watching = false;
                    continue;
                }
                let view = handle.snapshot();
                for entry in view.history.iter().skip(printed) {
                    print_entry(entry);
                }
                printed = printed.max(view.history_len());
            }
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if signal.is_ok() && handle.stop_auto_complete() {
                    eprintln!("Stopping after the current step...");
                }
            }
        }
    };

    for entry in handle.snapshot().history.iter().skip(printed) {
        print_entry(entry);
    }
    outcome
}

/// Recoverable errors are left in the session view for the loop to offer a
/// retry; anything else ends the command.
fn settle_submit_error(err: SessionError) -> Result<()> {
    if err.is_recoverable() {
        return Ok(());
    }
    Err(AssessError::Session(err).into())
}

fn deliver(
    handle: &SessionHandle,
    out: Option<&Path>,
    history_json: Option<&Path>,
) -> Result<ExitCode> {
    let report = handle
        .get_report()
        .ok_or(AssessError::Session(SessionError::NotCompleted))?;

    match out {
        Some(path) => {
            std::fs::write(path, &report.markdown)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("✓ Report written to {}", path.display());
        }
        None => println!("{}", report.markdown),
    }
    write_history(handle, history_json)?;
    Ok(ExitCode::SUCCESS)
}

fn write_history(handle: &SessionHandle, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let history = handle.get_history();
    let json = serde_json::to_string_pretty(&history)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write history to {}", path.display()))?;
    eprintln!("✓ {} answer(s) written to {}", history.len(), path.display());
    Ok(())
}

fn print_phase_header(view: &SessionView) {
    println!();
    println!(
        "── Phase {}/{}: {} ──",
        view.phase_index + 1,
        view.phase_count,
        view.phase
    );
}

fn print_question(number: usize, question: &QuestionSpec) {
    println!();
    println!("Q{number}. {}", question.text);
    for (i, option) in question.options().iter().enumerate() {
        println!("   {}. {option}", i + 1);
    }
    match question.answer_type {
        AnswerType::MultipleChoice => println!("   (choose one or more, comma separated)"),
        AnswerType::SingleChoice | AnswerType::Scale => println!("   (choose one)"),
        AnswerType::Text => {}
    }
}

fn print_entry(entry: &HistoryEntry) {
    println!("[{}] {}", entry.phase, entry.question);
    println!("   → {} ({})", entry.answer, entry.source);
}

/// Replace option numbers typed by the user with the option text. Tokens
/// that already name an option are left alone.
fn expand_option_numbers(input: &str, question: &QuestionSpec) -> String {
    let options = question.options();
    if options.is_empty() {
        return input.to_string();
    }
    input
        .split(',')
        .map(str::trim)
        .map(|token| {
            let names_option = options.iter().any(|o| o.eq_ignore_ascii_case(token));
            match token.parse::<usize>() {
                Ok(n) if !names_option && (1..=options.len()).contains(&n) => {
                    options[n - 1].clone()
                }
                _ => token.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

async fn prompt(input: &mut InputLines, text: &str) -> Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

/// Yes unless the answer starts with `n`. Closed input counts as no.
async fn confirm(input: &mut InputLines, text: &str) -> Result<bool> {
    let answer = prompt(input, text).await?;
    Ok(answer.is_some_and(|line| !line.trim().to_ascii_lowercase().starts_with('n')))
}
