//! # lettera
//!
//! Command-line front end: classify or extract letters from saved replies,
//! or hold a drafting conversation against the configured backend.

#![deny(unsafe_code)]

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lettera_core::SystemClock;
use lettera_engine::{
    open_store, orchestrator_from_settings, spawn_idle_watchdog, ClearOutcome, EngineError,
    FailureReason, MailtoLink, Orchestrator, RateLimitTracker, TurnOutcome, UserInput,
};
use lettera_letter::{has_sentinel_pair, LetterDetector, LetterExtractor};
use lettera_settings::{load_settings, load_settings_from_path, LetteraSettings};
use lettera_store::RestoreOutcome;
use lettera_telemetry::{init_telemetry, TelemetryConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Draft formal letters with an AI assistant.
#[derive(Parser, Debug)]
#[command(name = "lettera", version, about = "Draft formal letters with an AI assistant")]
struct Cli {
    /// Settings file (defaults to `~/.lettera/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether a saved reply contains a letter ("-" reads stdin).
    Detect { file: PathBuf },
    /// Print the letter extracted from a saved reply ("-" reads stdin).
    Extract { file: PathBuf },
    /// Interactive conversation.
    Chat {
        /// Ignore the daily message ceiling.
        #[arg(long)]
        exempt: bool,
    },
    /// Show today's message count.
    Usage,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("failed to load settings")?;

    let _telemetry = init_telemetry(&TelemetryConfig {
        level: settings.logging.level.clone(),
        module_levels: Vec::new(),
        json: settings.logging.json,
    });

    match cli.command {
        Command::Detect { file } => detect(&settings, &read_input(&file)?),
        Command::Extract { file } => extract(&settings, &read_input(&file)?),
        Command::Chat { exempt } => chat(&settings, exempt).await,
        Command::Usage => usage(&settings),
    }
}

fn read_input(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

fn detect(settings: &LetteraSettings, text: &str) -> Result<()> {
    let detector = LetterDetector::new(settings.detector.min_letter_chars);
    let signals = detector.signals(text);
    println!("letter:    {}", detector.is_letter(text));
    println!("sentinels: {}", has_sentinel_pair(text));
    println!(
        "signals:   opening={} closing={} subject={}",
        signals.opening, signals.closing, signals.subject
    );
    println!("chars:     {}", text.chars().count());
    Ok(())
}

fn extract(settings: &LetteraSettings, text: &str) -> Result<()> {
    let extractor = LetterExtractor::new(settings.extractor.fallback_min_chars);
    match extractor.extract(text) {
        Some(letter) => {
            println!("{letter}");
            Ok(())
        }
        None => bail!("no letter found"),
    }
}

fn usage(settings: &LetteraSettings) -> Result<()> {
    let store = open_store(&settings.storage)?;
    let tracker = RateLimitTracker::new(store, Arc::new(SystemClock));
    let state = tracker.read();
    print_usage(state.message_count, settings.rate_limit.daily_ceiling, tracker.is_degraded());
    Ok(())
}

fn print_usage(count: u32, ceiling: u32, degraded: bool) {
    println!("{count}/{ceiling} messages today");
    if degraded {
        println!("(storage unavailable, counting in memory only)");
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn chat(settings: &LetteraSettings, exempt: bool) -> Result<()> {
    let orch = orchestrator_from_settings(settings, Arc::new(SystemClock), exempt)?;
    if let RestoreOutcome::Restored(_) = orch.startup() {
        println!("(restored unsaved conversation)");
    }
    tracing::info!(conversation = %orch.conversation_id(), "chat started");

    let shutdown = CancellationToken::new();
    let watchdog = spawn_idle_watchdog(
        orch.clone(),
        Duration::from_secs(settings.session.watchdog_interval_secs),
        Duration::from_secs(settings.session.idle_timeout_secs),
        shutdown.clone(),
    );

    println!(
        "Commands: /draft /mailto <address> /html <file> /case /nosave /attach <file> [text] /usage /clear /quit"
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(raw) = lines.next_line().await? {
        let line = raw.trim();
        let (command, rest) = line
            .split_once(' ')
            .map_or((line, ""), |(c, r)| (c, r.trim()));
        match command {
            "/quit" => break,
            "/clear" => match orch.clear() {
                ClearOutcome::Cleared => println!("conversation cleared"),
                ClearOutcome::RefusedWhileDictating => println!("stop dictation first"),
            },
            "/draft" => match orch.export() {
                Some(export) => println!("{}", export.clipboard_text()),
                None => println!("no letter from this session yet"),
            },
            "/mailto" => match orch.export() {
                Some(export) => match export.mailto(rest, settings.export.mailto_max_url_len) {
                    MailtoLink::Complete(url) => println!("{url}"),
                    MailtoLink::BodyOmitted { url, hint } => {
                        println!("{hint}");
                        println!("{url}");
                    }
                },
                None => println!("no letter from this session yet"),
            },
            "/html" => match orch.export() {
                Some(export) => {
                    std::fs::write(rest, export.printable_html())
                        .with_context(|| format!("failed to write {rest}"))?;
                    println!("wrote {rest}");
                }
                None => println!("no letter from this session yet"),
            },
            "/case" => match orch.save_to_case() {
                Some(payload) => println!("{}", payload.to_json()?),
                None => println!("nothing to save to a case"),
            },
            "/nosave" => {
                orch.decline_save();
                println!("ok, not saving this conversation");
            }
            "/usage" => print_usage(
                orch.usage().message_count,
                settings.rate_limit.daily_ceiling,
                orch.usage_degraded(),
            ),
            "/attach" => {
                let (path, text) = rest.split_once(' ').unwrap_or((rest, ""));
                let path = Path::new(path);
                match tokio::fs::read(path).await {
                    Ok(data) => {
                        let input = UserInput::text(text).with_attachment(data, mime_for(path));
                        run_turn(&orch, input).await;
                    }
                    Err(e) => println!("cannot read {}: {e}", path.display()),
                }
            }
            "" => {}
            _ => run_turn(&orch, UserInput::text(line)).await,
        }
        prompt();
    }

    shutdown.cancel();
    watchdog.await?;
    Ok(())
}

/// Run one turn; Ctrl-C cancels it.
async fn run_turn(orch: &Orchestrator, input: UserInput) {
    let mut task = tokio::spawn({
        let orch = orch.clone();
        async move { orch.submit(input).await }
    });
    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            orch.cancel();
            task.await
        }
    };

    let outcome = match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(EngineError::Validation(e))) => {
            println!("{e}");
            return;
        }
        Ok(Err(e)) => {
            println!("error: {e}");
            return;
        }
        Err(e) => {
            println!("turn aborted: {e}");
            return;
        }
    };

    let last_reply = || {
        orch.messages()
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    };
    match outcome {
        TurnOutcome::Ignored => println!("(still waiting for the previous reply)"),
        TurnOutcome::Limited => {
            println!("Daily message limit reached. Your draft is still available: /draft, /mailto, /html.")
        }
        TurnOutcome::Cancelled => println!("(cancelled)"),
        TurnOutcome::Replied { limit_reached } => {
            println!("{}", last_reply());
            if limit_reached {
                println!("(daily limit reached after this reply)");
            }
        }
        TurnOutcome::DraftProduced { limit_reached } => {
            println!("{}\n", last_reply());
            println!("{}", orch.draft().text);
            if limit_reached {
                println!("(daily limit reached after this reply)");
            }
            if orch.should_offer_save() {
                println!("Save this letter to a case? /case to save, /nosave to dismiss.");
            }
        }
        TurnOutcome::Failed { reason } => {
            println!("{}", last_reply());
            if let FailureReason::Gateway(e) = reason {
                tracing::debug!(kind = e.error_kind(), "turn failed");
            }
        }
    }
}
