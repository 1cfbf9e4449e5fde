//! Autopilot - Workshop Deck Replay Console
//!
//! Replays the exercises of a markdown slide deck into a running tmux
//! session. Interactive by default: every step is shown and waits for a key.
//!
//! # Usage
//!
//! ```bash
//! # Interactive, resuming from state.toml
//! autopilot intro.md
//!
//! # Start over, drive a specific tmux pane
//! autopilot intro.md --fresh --target 0:1
//!
//! # Unattended run (exits non-zero if any snippet failed)
//! autopilot intro.md --batch --exclude extra-details
//!
//! # Show what would be played
//! autopilot intro.md --dump
//!
//! # Verbose logging
//! RUST_LOG=debug autopilot intro.md
//! ```

mod keys;
mod logging;
mod operator;
mod screen;

use std::io::{self, IsTerminal};
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::{error, info};

use autopilot_core::{
    default_config_path, load_config_from_path, ConfigOverrides, Deck, Multiplexer, Outcome,
    Pacer, Playback, PlaybackOptions, PlaybackState, PlaybackSummary, RunLog, StateStore,
    TerminalDriver, TmuxMultiplexer, Unattended,
};

use logging::init_logging;
use operator::{spawn_key_reader, ConsoleOperator};

/// Autopilot - replay workshop deck exercises into tmux
#[derive(Parser, Debug)]
#[command(name = "autopilot")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Markdown deck to play
    #[arg(value_name = "DECK")]
    deck: PathBuf,

    /// Configuration file path
    #[arg(short = 'c', long, env = "AUTOPILOT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where playback state is saved between runs
    #[arg(long, value_name = "PATH")]
    state_file: Option<PathBuf>,

    /// Append-only record of executed snippets
    #[arg(long, value_name = "PATH")]
    run_log: Option<PathBuf>,

    /// tmux target pane (passed to `-t`)
    #[arg(short = 't', long, value_name = "TMUX_TARGET")]
    target: Option<String>,

    /// Skip slides with this class (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "CLASS")]
    exclude: Vec<String>,

    /// Run unattended to the end of the deck
    #[arg(long)]
    batch: bool,

    /// Ignore saved state and start from the first slide
    #[arg(long)]
    fresh: bool,

    /// Print the parsed deck as JSON and exit
    #[arg(long)]
    dump: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(target) = &self.target {
            overrides = overrides.with_target(target.clone());
        }
        if let Some(path) = &self.state_file {
            overrides = overrides.with_state_file(path.clone());
        }
        if let Some(path) = &self.run_log {
            overrides = overrides.with_run_log(path.clone());
        }
        if self.batch {
            overrides = overrides.with_pause_on_error(false);
        }
        overrides
    }
}

/// Exit early unless stdin and stdout are a terminal
fn require_terminal() {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: interactive autopilot requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means:");
        eprintln!("  - Piped stdin/stdout");
        eprintln!("  - SSH without -t flag");
        eprintln!();
        eprintln!("Use --batch to play the deck unattended.");
        std::process::exit(1);
    }
}

/// Play interactively with the keyboard in raw mode
async fn run_console<M: Multiplexer>(
    playback: &mut Playback<M>,
    pacer: Pacer,
) -> Result<PlaybackSummary> {
    require_terminal();

    // Restore the terminal before a panic message is printed
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        original_hook(panic_info);
    }));

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut operator = ConsoleOperator::new(spawn_key_reader(pacer));
    let summary = playback.run(&mut operator).await;
    disable_raw_mode().context("Failed to restore terminal")?;

    Ok(summary)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging();

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config =
        load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    info!(source = %config.source(), "Configuration loaded");

    let text = tokio::fs::read_to_string(&args.deck)
        .await
        .with_context(|| format!("Failed to read deck: {}", args.deck.display()))?;
    let deck = Deck::parse_with_exclusions(&text, &args.exclude)
        .with_context(|| format!("Failed to parse deck: {}", args.deck.display()))?;
    info!(
        slides = deck.len(),
        excluded = deck.excluded_slides(),
        snippets = deck.snippet_count(),
        "Deck loaded"
    );

    if args.dump {
        println!("{}", serde_json::to_string_pretty(&deck)?);
        return Ok(ExitCode::SUCCESS);
    }

    let pacer = Pacer::new();
    let driver = TerminalDriver::new(
        TmuxMultiplexer::new(config.program.clone(), config.target.clone()),
        config.driver.clone(),
        pacer.clone(),
    );
    if let Err(e) = driver.attach().await {
        error!(error = %e, "No tmux session");
        eprintln!("{e}");
        return Ok(ExitCode::FAILURE);
    }

    let store = StateStore::new(config.state_file.clone());
    let mut state = if args.fresh {
        PlaybackState::new()
    } else {
        store.load_or_default(&deck).await
    };
    if args.batch {
        state.interactive = false;
    }

    let mut playback = Playback::new(
        deck,
        driver,
        Box::new(config.desktop.clone()),
        store,
        RunLog::new(config.run_log.clone()),
    )
    .with_state(state)
    .with_options(PlaybackOptions {
        pause_on_error: config.pause_on_error,
    });

    let summary = if args.batch {
        playback.run(&mut Unattended).await
    } else {
        run_console(&mut playback, pacer).await?
    };

    println!(
        "{} snippet(s) executed, {} failed; run log in {}",
        summary.executed,
        summary.failed,
        config.run_log.display()
    );

    if args.batch && (summary.failed > 0 || summary.outcome != Outcome::Finished) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
