//! Playback Loop
//!
//! Walks the deck snippet by snippet, executing each one against the
//! terminal. The loop alternates between two states:
//!
//! - **Awaiting a command**: in interactive mode the [`Operator`] picks the
//!   next [`Command`]; otherwise the loop executes.
//! - **Executing**: the current snippet runs with the pacer armed, so a
//!   keypress can cut its waits short.
//!
//! The pacer also stays armed for as long as the session is unattended, so a
//! keypress between two snippets stops the run before the next one starts
//! instead of being queued as a command.
//!
//! Failures are never fatal. Each one is logged, written to the run log, and
//! followed by an attempt to get back to a prompt. With `pause_on_error` a
//! failure also hands control back to the operator.
//!
//! State is saved before every command, so a crash or `q` resumes on the
//! same step.

use std::sync::OnceLock;

use chrono::Local;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::deck::{Deck, Method, Snippet};
use crate::desktop::{Desktop, Focus};
use crate::driver::{Multiplexer, TerminalDriver, Wait};
use crate::error::ActionError;
use crate::operator::{Command, Operator, StepView};
use crate::runlog::{RunLog, RunRecord};
use crate::state::PlaybackState;
use crate::store::StateStore;

/// Placeholder replaced by the harvested node address in `open` URLs
pub const NODE_PLACEHOLDER: &str = "/node1";

/// Shown while an opened link waits for the operator
const OPEN_ACKNOWLEDGE: &str = "Press any key to continue to next step...";

fn leading_indent() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n +").expect("valid indentation regex"))
}

/// Playback behaviour knobs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackOptions {
    /// Return to interactive mode when a snippet fails
    pub pause_on_error: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            pause_on_error: true,
        }
    }
}

/// Why the loop stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The operator quit
    Quit,
    /// An unattended run reached the end of the deck
    Finished,
}

/// What happened during a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackSummary {
    /// Snippets executed
    pub executed: usize,
    /// Snippets that failed
    pub failed: usize,
    /// Why the loop stopped
    pub outcome: Outcome,
}

/// The playback state machine
pub struct Playback<M: Multiplexer> {
    deck: Deck,
    driver: TerminalDriver<M>,
    desktop: Box<dyn Desktop>,
    store: StateStore,
    run_log: RunLog,
    state: PlaybackState,
    options: PlaybackOptions,
}

impl<M: Multiplexer> Playback<M> {
    /// Create a playback session starting from default state
    pub fn new(
        deck: Deck,
        driver: TerminalDriver<M>,
        desktop: Box<dyn Desktop>,
        store: StateStore,
        run_log: RunLog,
    ) -> Self {
        Self {
            deck,
            driver,
            desktop,
            store,
            run_log,
            state: PlaybackState::default(),
            options: PlaybackOptions::default(),
        }
    }

    /// Start from `state` (clamped to the deck)
    #[must_use]
    pub fn with_state(mut self, mut state: PlaybackState) -> Self {
        state.check_bounds(&self.deck);
        self.state = state;
        self
    }

    /// Set playback options
    #[must_use]
    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    /// Current state
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// The deck being played
    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// The terminal driver
    pub fn driver(&self) -> &TerminalDriver<M> {
        &self.driver
    }

    /// Run until the operator quits or an unattended run finishes the deck
    pub async fn run(&mut self, operator: &mut dyn Operator) -> PlaybackSummary {
        let mut executed = 0;
        let mut failed = 0;
        if !self.state.interactive {
            self.driver.pacer().arm();
        }

        let outcome = loop {
            self.save().await;
            self.present().await;

            let view = StepView {
                deck: &self.deck,
                slide: self.current_slide(),
                snippet: self.state.current(&self.deck),
                state: &self.state,
            };
            operator.observe(&view);

            if !self.state.interactive && self.driver.pacer().is_interrupted() {
                info!(
                    slide = self.state.slide,
                    snippet = self.state.snippet,
                    "Interrupted by operator between snippets"
                );
                self.take_control();
                continue;
            }

            let command = if self.state.interactive {
                operator.command(&view).await
            } else if self.state.has_work_ahead(&self.deck) {
                Command::Execute
            } else {
                break self.finish().await;
            };

            match command {
                Command::Next => self.state.move_forward(&self.deck),
                Command::Previous => self.state.move_backward(&self.deck),
                Command::Toggle(toggle) => {
                    let value = self.state.toggle(toggle);
                    info!(flag = toggle.as_str(), value, "Toggled");
                }
                Command::GoTo { slide, snippet } => {
                    self.state.go_to(&self.deck, slide, snippet);
                }
                Command::Continue => {
                    info!("Continuing non-interactively until next error");
                    self.state.interactive = false;
                    self.driver.pacer().arm();
                }
                Command::Quit => {
                    self.driver.pacer().disarm();
                    self.save().await;
                    break Outcome::Quit;
                }
                Command::Execute => {
                    let Some(snippet) = self.state.current(&self.deck).cloned() else {
                        self.advance_to_next_snippet();
                        continue;
                    };

                    executed += 1;
                    if !self.execute(&snippet, operator).await {
                        failed += 1;
                    }
                    let last = self.deck.step_of(snippet.slide, snippet.index)
                        == Some(self.deck.snippet_count() - 1);
                    self.state.move_forward(&self.deck);
                    if last && !self.state.interactive {
                        break self.finish().await;
                    }
                }
                Command::Unrecognized(key) => warn!(key = %key, "Unknown command"),
            }
        };

        info!(executed, failed, outcome = ?outcome, "Playback stopped");
        PlaybackSummary {
            executed,
            failed,
            outcome,
        }
    }

    fn current_slide(&self) -> &crate::deck::Slide {
        // The cursor is clamped and a parsed deck is never empty
        let index = self.state.slide.clamp(1, self.deck.len()) - 1;
        &self.deck.slides()[index]
    }

    /// Skip slides without snippets, then step onto the next snippet
    fn advance_to_next_snippet(&mut self) {
        while !self.current_slide().has_snippets() {
            self.state.move_forward(&self.deck);
            if self.state.slide == self.deck.len() {
                break;
            }
        }
        self.state.move_forward(&self.deck);
    }

    /// Hand control back to the operator
    fn take_control(&mut self) {
        self.state.interactive = true;
        self.driver.pacer().disarm();
    }

    async fn finish(&mut self) -> Outcome {
        info!("Reached the end of the deck");
        self.driver.pacer().disarm();
        self.state.go_to(&self.deck, 1, 0);
        self.save().await;
        Outcome::Finished
    }

    async fn save(&self) {
        if let Err(e) = self.store.save(&self.state).await {
            error!(error = %e, "Could not save playback state");
        }
    }

    /// Desktop hooks for the step about to be shown
    async fn present(&self) {
        let result = if self.state.current(&self.deck).is_some() {
            self.focus(Focus::Terminal).await
        } else {
            let sync = if self.state.sync_slides {
                self.desktop.sync_slide(self.state.slide).await
            } else {
                Ok(())
            };
            match sync {
                Ok(()) => self.focus(Focus::Slides).await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "Desktop hook failed");
        }
    }

    async fn focus(&self, focus: Focus) -> Result<(), ActionError> {
        if self.state.switch_desktop {
            self.desktop.focus(focus).await
        } else {
            Ok(())
        }
    }

    /// Execute one snippet; returns whether it succeeded
    async fn execute(&mut self, snippet: &Snippet, operator: &mut dyn Operator) -> bool {
        info!(
            slide = snippet.slide,
            snippet = snippet.index,
            method = %snippet.method,
            data = %snippet.data,
            "Running snippet"
        );

        let pacer = self.driver.pacer().clone();
        if !pacer.is_armed() {
            pacer.arm();
        }
        let result = self.perform(snippet, operator).await;

        if let Err(e) = &result {
            error!(
                slide = snippet.slide,
                snippet = snippet.index,
                method = %snippet.method,
                data = %snippet.data,
                error = %e,
                "Snippet failed"
            );
            match self.driver.recover().await {
                Ok(Wait::Ready(prompt)) => self.note_address(prompt.address),
                Ok(Wait::Interrupted) => {}
                Err(e) => error!(error = %e, "Could not get back to a prompt"),
            }
            if self.options.pause_on_error {
                self.state.interactive = true;
            }
        }

        let interrupted = pacer.is_interrupted();
        if interrupted {
            info!(slide = snippet.slide, snippet = snippet.index, "Interrupted by operator");
            self.state.interactive = true;
        }
        if self.state.interactive {
            pacer.disarm();
        }

        let record = RunRecord {
            at: Local::now(),
            step: self.deck.step_of(snippet.slide, snippet.index),
            snippet,
            error: result.as_ref().err(),
            interrupted,
        };
        if let Err(e) = self.run_log.append(&record).await {
            warn!(
                path = %self.run_log.path().display(),
                error = %e,
                "Could not write run log"
            );
        }

        result.is_ok()
    }

    async fn perform(
        &mut self,
        snippet: &Snippet,
        operator: &mut dyn Operator,
    ) -> Result<(), ActionError> {
        match &snippet.method {
            Method::Bash => self.bash(snippet).await,
            Method::Hide => {
                if self.state.run_hidden {
                    self.bash(snippet).await
                } else {
                    debug!(data = %snippet.data, "Skipping hidden command");
                    Ok(())
                }
            }
            Method::Keys => {
                self.driver
                    .send_keys(&snippet.data, self.state.simulate_type)
                    .await?;
                Ok(())
            }
            Method::Key => {
                self.driver.send_keys(&snippet.data, false).await?;
                Ok(())
            }
            Method::Copy => {
                self.state.clipboard = self.copy_match(&snippet.data).await?;
                debug!(clipboard = %self.state.clipboard, "Copied to clipboard");
                Ok(())
            }
            Method::Paste => {
                debug!(clipboard = %self.state.clipboard, "Pasting from clipboard");
                let text = self.state.clipboard.clone();
                self.driver.send_keys(&text, self.state.simulate_type).await?;
                Ok(())
            }
            Method::CopyPaste => {
                let text = self.copy_match(&snippet.data).await?;
                self.state.clipboard.clone_from(&text);
                self.type_and_wait(snippet, &format!("{text}\n")).await
            }
            Method::Check => {
                if self.await_prompt().await?.is_interrupted() {
                    return Ok(());
                }
                self.verify_status().await
            }
            Method::Open => self.open(snippet, operator).await,
            Method::Tmux => {
                let args: Vec<String> = snippet
                    .data
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                self.driver.run(&args).await?;
                Ok(())
            }
            Method::Wait | Method::LongWait => {
                debug!(data = %snippet.data, "Wait consumed by the preceding command");
                Ok(())
            }
            Method::Unknown(name) => {
                warn!(method = %name, data = %snippet.data, "Unknown method");
                Ok(())
            }
        }
    }

    async fn bash(&mut self, snippet: &Snippet) -> Result<(), ActionError> {
        if self.await_prompt().await?.is_interrupted() {
            return Ok(());
        }
        self.type_and_wait(snippet, &prepare_command(&snippet.data))
            .await
    }

    /// Type a command, then wait for whatever signals its completion
    async fn type_and_wait(
        &mut self,
        snippet: &Snippet,
        command: &str,
    ) -> Result<(), ActionError> {
        if self
            .driver
            .send_keys(command, self.state.simulate_type)
            .await?
            .is_interrupted()
        {
            return Ok(());
        }
        if self.driver.settle().await.is_interrupted() {
            return Ok(());
        }

        let next = self
            .deck
            .slide(snippet.slide)
            .and_then(|slide| slide.next_of(snippet))
            .map(|next| (next.method.clone(), next.data.clone()));

        match next {
            Some((Method::Wait, needle)) => {
                let timeout = self.driver.settings().timeout;
                self.driver.wait_for_string(&needle, timeout).await?;
                Ok(())
            }
            Some((Method::LongWait, needle)) => {
                let timeout = self.driver.settings().long_timeout();
                self.driver.wait_for_string(&needle, timeout).await?;
                Ok(())
            }
            _ => {
                if self.await_prompt().await?.is_interrupted() {
                    return Ok(());
                }
                self.verify_status().await
            }
        }
    }

    async fn await_prompt(&mut self) -> Result<Wait<()>, ActionError> {
        let timeout = self.driver.settings().timeout;
        match self.driver.wait_for_prompt(timeout).await? {
            Wait::Ready(prompt) => {
                self.note_address(prompt.address);
                Ok(Wait::Ready(()))
            }
            Wait::Interrupted => Ok(Wait::Interrupted),
        }
    }

    fn note_address(&mut self, address: Option<String>) {
        if let Some(address) = address {
            if self.state.node_address.as_deref() != Some(address.as_str()) {
                debug!(address = %address, "Node address");
            }
            self.state.node_address = Some(address);
        }
    }

    async fn verify_status(&mut self) -> Result<(), ActionError> {
        if self.state.verify_status {
            if let Wait::Ready(prompt) = self.driver.check_exit_status().await? {
                self.note_address(prompt.address);
            }
        }
        Ok(())
    }

    /// Last match of `pattern` on screen, with line breaks removed
    async fn copy_match(&self, pattern: &str) -> Result<String, ActionError> {
        let screen = self.driver.capture_pane().await?;
        let re = Regex::new(&format!("(?s){pattern}"))?;
        let found = re
            .captures_iter(&screen)
            .last()
            .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str().replace('\n', ""));

        found.ok_or_else(|| ActionError::PatternNotFound {
            pattern: pattern.to_string(),
        })
    }

    async fn open(
        &mut self,
        snippet: &Snippet,
        operator: &mut dyn Operator,
    ) -> Result<(), ActionError> {
        let url = match &self.state.node_address {
            Some(address) => snippet
                .data
                .replace(NODE_PLACEHOLDER, &format!("/{address}")),
            None => snippet.data.clone(),
        };

        if !self.state.open_links {
            debug!(url = %url, "Not opening link");
            return Ok(());
        }

        self.desktop.open_url(&url).await?;
        self.focus(Focus::Browser).await?;
        if self.state.interactive {
            // The key that acknowledges must not count as an interrupt
            let pacer = self.driver.pacer();
            pacer.disarm();
            operator.acknowledge(OPEN_ACKNOWLEDGE).await;
            pacer.arm();
        }
        Ok(())
    }
}

/// Turn snippet data into a line the shell can run
///
/// Indentation after newlines and highlighting backticks are dropped, and a
/// trailing newline presses return.
fn prepare_command(data: &str) -> String {
    let mut command = leading_indent().replace_all(data, "\n").replace('`', "");
    command.push('\n');
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prepare_command() {
        assert_eq!(prepare_command("echo hi"), "echo hi\n");
        assert_eq!(
            prepare_command("docker run \\\n    -d `nginx`"),
            "docker run \\\n-d nginx\n"
        );
    }

    #[test]
    fn test_default_options_pause_on_error() {
        assert!(PlaybackOptions::default().pause_on_error);
    }
}
