//! Desktop Hooks
//!
//! Side effects on the presenter's desktop: switching window manager
//! workspaces, keeping the browser slideshow on the current slide, and
//! opening links. All of them are best effort; the playback loop logs a
//! failure and carries on.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ActionError;

/// Workspace to bring to the front
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    /// The slideshow
    Slides,
    /// The terminal running the attendee shell
    Terminal,
    /// The browser showing an opened link
    Browser,
}

/// Presenter desktop integration
#[async_trait]
pub trait Desktop: Send + Sync {
    /// Bring a workspace to the front
    async fn focus(&self, focus: Focus) -> Result<(), ActionError>;

    /// Show slide `number` in the browser slideshow
    async fn sync_slide(&self, number: usize) -> Result<(), ActionError>;

    /// Open `url` in the browser
    async fn open_url(&self, url: &str) -> Result<(), ActionError>;
}

/// A command line: program followed by its arguments
pub type CommandLine = Vec<String>;

/// [`Desktop`] that runs configured commands (i3-msg, xdg-open, ...)
#[derive(Clone, Debug, Default)]
pub struct CommandDesktop {
    /// Commands run in order to focus the slides
    pub focus_slides: Vec<CommandLine>,
    /// Commands run in order to focus the terminal
    pub focus_terminal: Vec<CommandLine>,
    /// Commands run in order to focus the browser
    pub focus_browser: Vec<CommandLine>,
    /// Slide sync command; the slide number is appended
    pub sync_slides: CommandLine,
    /// URL opener; the URL is appended
    pub open_url: CommandLine,
}

impl CommandDesktop {
    async fn run(&self, command: &[String], extra: Option<&str>) -> Result<(), ActionError> {
        let Some((program, args)) = command.split_first() else {
            return Ok(());
        };
        debug!(program = %program, args = ?args, extra, "Running desktop command");

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(extra) = extra {
            cmd.arg(extra);
        }
        let output = cmd.output().await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ActionError::Command {
                command: command.join(" "),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl Desktop for CommandDesktop {
    async fn focus(&self, focus: Focus) -> Result<(), ActionError> {
        let commands = match focus {
            Focus::Slides => &self.focus_slides,
            Focus::Terminal => &self.focus_terminal,
            Focus::Browser => &self.focus_browser,
        };
        for command in commands {
            self.run(command, None).await?;
        }
        Ok(())
    }

    async fn sync_slide(&self, number: usize) -> Result<(), ActionError> {
        self.run(&self.sync_slides, Some(&number.to_string())).await
    }

    async fn open_url(&self, url: &str) -> Result<(), ActionError> {
        self.run(&self.open_url, Some(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_commands_are_no_ops() {
        let desktop = CommandDesktop::default();
        desktop.focus(Focus::Slides).await.unwrap();
        desktop.sync_slide(3).await.unwrap();
        desktop.open_url("http://localhost").await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_command_reports_it() {
        let desktop = CommandDesktop {
            open_url: vec!["false".to_string()],
            ..CommandDesktop::default()
        };
        let err = desktop.open_url("http://x").await.unwrap_err();
        assert_eq!(err.kind(), "command");
    }

    #[tokio::test]
    async fn test_succeeding_command() {
        let desktop = CommandDesktop {
            focus_terminal: vec![vec!["true".to_string()], vec!["true".to_string(), "again".to_string()]],
            ..CommandDesktop::default()
        };
        desktop.focus(Focus::Terminal).await.unwrap();
    }
}
