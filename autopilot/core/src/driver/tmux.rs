//! tmux Multiplexer
//!
//! Shells out to the `tmux` client. Every call is a separate process; the
//! session is addressed with `-t <target>` when a target is configured,
//! otherwise tmux picks the most recent session.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use super::Multiplexer;
use crate::error::ActionError;

/// [`Multiplexer`] backed by the tmux command line client
#[derive(Clone, Debug)]
pub struct TmuxMultiplexer {
    program: String,
    target: Option<String>,
}

impl TmuxMultiplexer {
    /// Drive `program` (usually `tmux`), optionally pinned to `target`
    pub fn new(program: impl Into<String>, target: Option<String>) -> Self {
        Self {
            program: program.into(),
            target,
        }
    }

    /// The configured target, if any
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn targeted(&self, subcommand: &str) -> Vec<String> {
        let mut args = vec![subcommand.to_string()];
        if let Some(target) = &self.target {
            args.push("-t".to_string());
            args.push(target.clone());
        }
        args
    }

    async fn tmux(&self, args: &[String]) -> Result<String, ActionError> {
        trace!(program = %self.program, args = ?args, "Running tmux");
        let output = Command::new(&self.program).args(args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ActionError::Command {
                command: format!("{} {}", self.program, args.join(" ")),
                detail: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// tmux reads an argument ending in `;` as a command separator
fn escape_keys(keys: &str) -> String {
    match keys.strip_suffix(';') {
        Some(head) if !head.ends_with('\\') => format!("{head}\\;"),
        _ => keys.to_string(),
    }
}

#[async_trait]
impl Multiplexer for TmuxMultiplexer {
    async fn has_session(&self) -> bool {
        self.tmux(&self.targeted("has-session")).await.is_ok()
    }

    async fn send_keys(&self, keys: &str) -> Result<(), ActionError> {
        let mut args = self.targeted("send-keys");
        args.push(escape_keys(keys));
        self.tmux(&args).await.map(|_| ())
    }

    async fn capture_pane(&self) -> Result<String, ActionError> {
        let mut args = self.targeted("capture-pane");
        args.push("-p".to_string());
        self.tmux(&args).await
    }

    async fn new_window(&self) -> Result<(), ActionError> {
        self.tmux(&self.targeted("new-window")).await.map(|_| ())
    }

    async fn run(&self, args: &[String]) -> Result<String, ActionError> {
        self.tmux(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_semicolon_is_escaped() {
        assert_eq!(escape_keys(";"), "\\;");
        assert_eq!(escape_keys("echo a; echo b;"), "echo a; echo b\\;");
        assert_eq!(escape_keys("already\\;"), "already\\;");
        assert_eq!(escape_keys("ls\n"), "ls\n");
    }

    #[test]
    fn test_target_is_passed() {
        let tmux = TmuxMultiplexer::new("tmux", Some("0".to_string()));
        assert_eq!(tmux.targeted("send-keys"), vec!["send-keys", "-t", "0"]);
        let untargeted = TmuxMultiplexer::new("tmux", None);
        assert_eq!(untargeted.targeted("capture-pane"), vec!["capture-pane"]);
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let tmux = TmuxMultiplexer::new("/nonexistent/tmux-binary", None);
        assert!(!tmux.has_session().await);
        assert!(matches!(
            tmux.capture_pane().await,
            Err(ActionError::Io(_))
        ));
    }
}
