//! Terminal Driver
//!
//! Drives the attendee's shell through a terminal multiplexer: typing
//! commands, reading the screen, and waiting for the shell to come back.
//!
//! # Architecture
//!
//! ```text
//! Playback ──> TerminalDriver ──> dyn Multiplexer ──> tmux
//!                   │
//!                   └──> Pacer (every wait tick, interruptible)
//! ```
//!
//! The [`Multiplexer`] trait is the only place that touches tmux, so tests
//! run the driver against a scripted screen instead.
//!
//! All waits are bounded polling loops with `poll_interval` ticks. An operator
//! interrupt ends them with [`Wait::Interrupted`], which is not an error.

pub mod tmux;

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ActionError, SetupError};
use crate::pacer::Pacer;

pub use tmux::TmuxMultiplexer;

// =============================================================================
// Multiplexer Trait
// =============================================================================

/// Operations the harness needs from a terminal multiplexer
#[async_trait]
pub trait Multiplexer: Send + Sync {
    /// Whether a session is reachable
    async fn has_session(&self) -> bool;

    /// Send keys to the active pane in one call
    ///
    /// Key names (`^C`, `Space`, `Enter`) are interpreted by the multiplexer;
    /// anything else is typed as-is.
    async fn send_keys(&self, keys: &str) -> Result<(), ActionError>;

    /// Text currently visible in the active pane
    async fn capture_pane(&self) -> Result<String, ActionError>;

    /// Open a fresh window (used to recover from a stuck pane)
    async fn new_window(&self) -> Result<(), ActionError>;

    /// Run an arbitrary multiplexer command, returning its output
    async fn run(&self, args: &[String]) -> Result<String, ActionError>;
}

// =============================================================================
// Settings
// =============================================================================

/// Timing and prompt recognition for the driver
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverSettings {
    /// Deadline for prompt and string waits
    pub timeout: Duration,
    /// Multiplier applied to `timeout` for `longwait`
    pub long_wait_factor: u32,
    /// Delay between two screen captures
    pub poll_interval: Duration,
    /// Pause after sending a command
    pub settle: Duration,
    /// Upper bound of the random delay between simulated keystrokes
    pub typing_max_delay: Duration,
    /// Pause before and after a simulated newline
    pub newline_pause: Duration,
    /// Last line of an idle shell
    pub shell_prompt: String,
    /// Last line of an idle container shell
    pub container_prompts: Vec<String>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            long_wait_factor: 10,
            poll_interval: Duration::from_secs(1),
            settle: Duration::from_millis(500),
            typing_max_delay: Duration::from_millis(150),
            newline_pause: Duration::from_secs(1),
            shell_prompt: "$".to_string(),
            container_prompts: vec!["/ #".to_string()],
        }
    }
}

impl DriverSettings {
    /// Deadline used by `longwait`
    #[must_use]
    pub fn long_timeout(&self) -> Duration {
        self.timeout * self.long_wait_factor
    }
}

// =============================================================================
// Wait Results
// =============================================================================

/// Outcome of a wait that did not fail
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Wait<T> {
    /// The awaited condition was observed
    Ready(T),
    /// The operator interrupted the wait
    Interrupted,
}

impl<T> Wait<T> {
    /// Whether the operator interrupted the wait
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// A recognized prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    /// The prompt line as seen on screen
    pub line: String,
    /// Node address shown on the line above a shell prompt (`[node1] ...`)
    pub address: Option<String>,
}

fn bracketed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(.*)\]").expect("valid bracket regex"))
}

// =============================================================================
// Terminal Driver
// =============================================================================

/// High-level terminal operations on top of a [`Multiplexer`]
pub struct TerminalDriver<M: Multiplexer> {
    mux: M,
    settings: DriverSettings,
    pacer: Pacer,
}

impl<M: Multiplexer> TerminalDriver<M> {
    /// Create a driver
    pub fn new(mux: M, settings: DriverSettings, pacer: Pacer) -> Self {
        Self {
            mux,
            settings,
            pacer,
        }
    }

    /// The underlying multiplexer
    pub fn multiplexer(&self) -> &M {
        &self.mux
    }

    /// Driver settings
    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// The pacer all waits go through
    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Check for a session and acquire a prompt
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::NoSession`] when no session is reachable. Failing
    /// to see a prompt is only logged.
    pub async fn attach(&self) -> Result<(), SetupError> {
        if !self.mux.has_session().await {
            return Err(SetupError::no_session());
        }

        info!("Found tmux session. Trying to acquire shell prompt.");
        match self.wait_for_prompt(self.settings.timeout).await {
            Ok(_) => info!("Successfully connected to test cluster in tmux session."),
            Err(e) => warn!(error = %e, "No prompt yet, continuing anyway"),
        }
        Ok(())
    }

    /// Type `keys` into the pane
    ///
    /// With `simulate`, keys go one at a time with a random delay, and a
    /// newline is surrounded by longer pauses. Data starting with `^` is a
    /// key name and is never split.
    ///
    /// # Errors
    ///
    /// Returns an error if the multiplexer rejects the keys.
    pub async fn send_keys(&self, keys: &str, simulate: bool) -> Result<Wait<()>, ActionError> {
        if !simulate || keys.starts_with('^') {
            self.mux.send_keys(keys).await?;
            return Ok(Wait::Ready(()));
        }

        let mut buf = [0u8; 4];
        for ch in keys.chars() {
            if ch == '\n' && !self.pacer.pause(self.settings.newline_pause).await {
                return Ok(Wait::Interrupted);
            }
            self.mux.send_keys(ch.encode_utf8(&mut buf)).await?;
            if !self.pacer.pause(self.typing_delay()).await {
                return Ok(Wait::Interrupted);
            }
            if ch == '\n' && !self.pacer.pause(self.settings.newline_pause).await {
                return Ok(Wait::Interrupted);
            }
        }
        Ok(Wait::Ready(()))
    }

    fn typing_delay(&self) -> Duration {
        self.settings
            .typing_max_delay
            .mul_f64(rand::random::<f64>())
    }

    /// Current pane contents
    ///
    /// # Errors
    ///
    /// Returns an error if the pane cannot be captured.
    pub async fn capture_pane(&self) -> Result<String, ActionError> {
        self.mux.capture_pane().await
    }

    /// Short pause after sending a command
    pub async fn settle(&self) -> Wait<()> {
        if self.pacer.pause(self.settings.settle).await {
            Wait::Ready(())
        } else {
            Wait::Interrupted
        }
    }

    /// Poll until `needle` shows up on screen
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Timeout`] when `timeout` runs out first.
    pub async fn wait_for_string(
        &self,
        needle: &str,
        timeout: Duration,
    ) -> Result<Wait<()>, ActionError> {
        debug!(needle, "Waiting for string");
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.mux.capture_pane().await?.contains(needle) {
                return Ok(Wait::Ready(()));
            }
            if !self.pacer.pause(self.settings.poll_interval).await {
                return Ok(Wait::Interrupted);
            }
        }
        Err(ActionError::Timeout {
            what: needle.to_string(),
            after: timeout,
        })
    }

    /// Poll until the last line of the screen is a known prompt
    ///
    /// On the shell prompt, the last `[...]` on screen is returned as the
    /// node address.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Timeout`] when `timeout` runs out first.
    pub async fn wait_for_prompt(&self, timeout: Duration) -> Result<Wait<Prompt>, ActionError> {
        debug!("Waiting for prompt");
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let screen = self.mux.capture_pane().await?;
            if let Some(prompt) = self.recognize_prompt(&screen) {
                return Ok(Wait::Ready(prompt));
            }
            if !self.pacer.pause(self.settings.poll_interval).await {
                return Ok(Wait::Interrupted);
            }
        }
        Err(ActionError::Timeout {
            what: "prompt".to_string(),
            after: timeout,
        })
    }

    fn recognize_prompt(&self, screen: &str) -> Option<Prompt> {
        // Below the cursor the pane is padded with empty lines
        let output = screen.trim_end_matches('\n');
        let last_line = output.rsplit('\n').next().unwrap_or_default().trim_end();

        if last_line == self.settings.shell_prompt {
            let address = bracketed()
                .captures_iter(output)
                .last()
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string());
            return Some(Prompt {
                line: last_line.to_string(),
                address,
            });
        }
        if self.settings.container_prompts.iter().any(|p| p == last_line) {
            return Some(Prompt {
                line: last_line.to_string(),
                address: None,
            });
        }

        debug!(last_line, "Could not find a known prompt on last line");
        None
    }

    /// Ask the shell for the previous command's exit status
    ///
    /// Echoes a one-time token next to `$?` and expects exactly one
    /// `<token> <code>` line back. On success the prompt seen after the echo
    /// is returned, so its address can be recorded.
    ///
    /// # Errors
    ///
    /// Fails when the token is missing or duplicated, or the code is non-zero.
    pub async fn check_exit_status(&self) -> Result<Wait<Prompt>, ActionError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        debug!(token = %token, "Sending token to get exit status");
        self.mux.send_keys(&format!("echo {token} $?\n")).await?;

        if self.settle().await.is_interrupted() {
            return Ok(Wait::Interrupted);
        }
        let prompt = match self.wait_for_prompt(self.settings.timeout).await? {
            Wait::Ready(prompt) => prompt,
            Wait::Interrupted => return Ok(Wait::Interrupted),
        };

        let screen = self.mux.capture_pane().await?;
        let pattern = Regex::new(&format!(r"(?m)^{token} ([0-9]+)$"))?;
        let codes: Vec<&str> = pattern
            .captures_iter(&screen)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect();
        debug!(codes = ?codes, "Got exit status");

        match codes.as_slice() {
            [] => Err(ActionError::StatusUnavailable { token }),
            [code] => match code.parse::<i32>() {
                Ok(0) => Ok(Wait::Ready(prompt)),
                Ok(code) => Err(ActionError::NonZeroExit { code }),
                Err(_) => Err(ActionError::StatusUnavailable { token }),
            },
            _ => Err(ActionError::StatusAmbiguous {
                token,
                count: codes.len(),
            }),
        }
    }

    /// Get back to a prompt after a failure
    ///
    /// Opens a new window when the current pane does not come back.
    ///
    /// # Errors
    ///
    /// Returns the error of the second attempt.
    pub async fn recover(&self) -> Result<Wait<Prompt>, ActionError> {
        match self.wait_for_prompt(self.settings.timeout).await {
            Ok(wait) => Ok(wait),
            Err(e) => {
                warn!(error = %e, "Pane did not come back, opening a new window");
                self.mux.new_window().await?;
                self.wait_for_prompt(self.settings.timeout).await
            }
        }
    }

    /// Run a raw multiplexer command
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(&self, args: &[String]) -> Result<String, ActionError> {
        self.mux.run(args).await
    }
}
