//! Error Types
//!
//! Failures are split by how far they propagate:
//!
//! - [`ActionError`]: anything that can go wrong while executing one snippet.
//!   Always recoverable; the playback loop logs it and moves on.
//! - [`SetupError`]: no terminal session to drive. Fatal at startup.
//! - [`DeckError`]: the deck could not be turned into slides.
//! - [`StateError`]: the playback state could not be written.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure while executing a single snippet
#[derive(Debug, Error)]
pub enum ActionError {
    /// A wait primitive ran past its deadline
    #[error("Timed out after {}s while waiting for {what}", .after.as_secs())]
    Timeout {
        /// What we were waiting for (a string, or "prompt")
        what: String,
        /// The deadline that was exceeded
        after: Duration,
    },

    /// The exit-status token never showed up on screen
    #[error("Couldn't retrieve status code {token}. Timed out?")]
    StatusUnavailable {
        /// The one-time token that was echoed
        token: String,
    },

    /// The exit-status token showed up more than once
    #[error("More than one status code {token} on screen ({count} matches)")]
    StatusAmbiguous {
        /// The one-time token that was echoed
        token: String,
        /// How many `<token> <code>` lines were captured
        count: usize,
    },

    /// The command ran and returned a non-zero code
    #[error("Non-zero exit status: {code}")]
    NonZeroExit {
        /// Exit status reported by the shell
        code: i32,
    },

    /// A copy pattern found nothing on screen
    #[error("Could not find regex {pattern} in output")]
    PatternNotFound {
        /// The pattern from the snippet
        pattern: String,
    },

    /// A copy pattern is not a valid regex
    #[error("Invalid regex in snippet: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// An external command (tmux, browser, window manager) failed
    #[error("`{command}` failed: {detail}")]
    Command {
        /// The command line that was run
        command: String,
        /// Exit status or stderr
        detail: String,
    },

    /// Spawning a process or touching a file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActionError {
    /// Short class name, written next to `ERR` in the run log
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::StatusUnavailable { .. } | Self::StatusAmbiguous { .. } => "status",
            Self::NonZeroExit { .. } => "exit",
            Self::PatternNotFound { .. } | Self::InvalidPattern(_) => "pattern",
            Self::Command { .. } => "command",
            Self::Io(_) => "io",
        }
    }

    /// Whether this failure came from a wait deadline
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// No terminal session could be reached at startup
#[derive(Debug, Error)]
pub enum SetupError {
    /// `tmux has-session` failed
    #[error("Couldn't connect to tmux. Please set up tmux first.\n{instructions}")]
    NoSession {
        /// Ways to get a session the harness can drive
        instructions: String,
    },
}

impl SetupError {
    /// Build the no-session error with instructions for the current user
    #[must_use]
    pub fn no_session() -> Self {
        // SAFETY: getuid has no preconditions and cannot fail
        let uid = unsafe { libc::getuid() };
        let instructions = format!(
            "
1. If you're running this directly from a node:

tmux

2. If you want to control a remote tmux:

rm -f /tmp/tmux-{uid}/default && ssh -t -L /tmp/tmux-{uid}/default:/tmp/tmux-1001/default docker@$IPADDR tmux new-session -As 0

3. If you cannot control a remote tmux:

tmux new-session ssh docker@$IPADDR
"
        );
        Self::NoSession { instructions }
    }
}

/// The deck could not be parsed into slides
#[derive(Debug, Error)]
pub enum DeckError {
    /// Every slide was excluded (or the document was empty)
    #[error("Deck has no slides left after excluding classes {excluded:?}")]
    Empty {
        /// Classes that were excluded
        excluded: Vec<String>,
    },
}

/// The playback state could not be persisted
#[derive(Debug, Error)]
pub enum StateError {
    /// Writing the state file failed
    #[error("Failed to write state file {path}: {source}")]
    Write {
        /// Target path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Serializing the state failed
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),
}
