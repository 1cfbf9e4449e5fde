//! Test Utilities
//!
//! Scripted stand-ins for the terminal, the desktop and the operator, so the
//! driver and the playback loop can be exercised without tmux.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::desktop::{Desktop, Focus};
use crate::driver::Multiplexer;
use crate::error::ActionError;
use crate::operator::{Command, Operator, StepView};

// =============================================================================
// Scripted Shell
// =============================================================================

#[derive(Debug)]
struct ShellInner {
    session: bool,
    prompt: String,
    screen: String,
    screen_after_new_window: Option<String>,
    line: String,
    default_exit: i32,
    last_exit: i32,
    status_echo: usize,
    exit_codes: HashMap<String, i32>,
    outputs: HashMap<String, String>,
    sent: Vec<String>,
    commands: Vec<String>,
    tmux_runs: Vec<Vec<String>>,
    windows_opened: usize,
}

/// A [`Multiplexer`] simulating a shell that answers instantly
///
/// Keys are buffered until a newline, then the line is "run": its scripted
/// output and a fresh prompt are appended to the screen. `echo <token> $?`
/// prints the previous command's exit code, once per
/// [`set_status_echo`](Self::set_status_echo) count.
#[derive(Clone, Debug)]
pub struct ScriptedShell {
    inner: Arc<Mutex<ShellInner>>,
}

impl Default for ScriptedShell {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedShell {
    /// A shell sitting at a `$` prompt
    #[must_use]
    pub fn new() -> Self {
        Self::with_prompt("$")
    }

    /// A shell whose idle screen ends with `prompt` (may span lines)
    #[must_use]
    pub fn with_prompt(prompt: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ShellInner {
                session: true,
                prompt: prompt.to_string(),
                screen: prompt.to_string(),
                screen_after_new_window: None,
                line: String::new(),
                default_exit: 0,
                last_exit: 0,
                status_echo: 1,
                exit_codes: HashMap::new(),
                outputs: HashMap::new(),
                sent: Vec::new(),
                commands: Vec::new(),
                tmux_runs: Vec::new(),
                windows_opened: 0,
            })),
        }
    }

    /// Replace the screen contents
    pub fn set_screen(&self, screen: &str) {
        self.inner.lock().screen = screen.to_string();
    }

    /// Screen shown once a new window is opened
    pub fn set_screen_after_new_window(&self, screen: &str) {
        self.inner.lock().screen_after_new_window = Some(screen.to_string());
    }

    /// Whether `has_session` succeeds
    pub fn set_session(&self, session: bool) {
        self.inner.lock().session = session;
    }

    /// Exit code of every command without a specific one
    pub fn set_exit_code(&self, code: i32) {
        let mut inner = self.inner.lock();
        inner.default_exit = code;
        inner.last_exit = code;
    }

    /// How many `<token> <code>` lines an exit-status echo prints
    pub fn set_status_echo(&self, count: usize) {
        self.inner.lock().status_echo = count;
    }

    /// Script the exit code of `command`
    pub fn fail(&self, command: &str, code: i32) {
        self.inner.lock().exit_codes.insert(command.to_string(), code);
    }

    /// Script the output of `command`
    pub fn respond(&self, command: &str, output: &str) {
        self.inner
            .lock()
            .outputs
            .insert(command.to_string(), output.to_string());
    }

    /// Every `send_keys` argument, in order
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.inner.lock().sent.clone()
    }

    /// Every completed line, excluding exit-status echoes
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.inner.lock().commands.clone()
    }

    /// Raw multiplexer commands received through `run`
    #[must_use]
    pub fn tmux_runs(&self) -> Vec<Vec<String>> {
        self.inner.lock().tmux_runs.clone()
    }

    /// How many times a new window was opened
    #[must_use]
    pub fn windows_opened(&self) -> usize {
        self.inner.lock().windows_opened
    }

    /// Current screen contents
    #[must_use]
    pub fn screen(&self) -> String {
        self.inner.lock().screen.clone()
    }
}

impl ShellInner {
    fn run_line(&mut self, line: &str) {
        let output = if let Some(token) = status_token(line) {
            format!("{token} {}\n", self.last_exit).repeat(self.status_echo)
        } else {
            self.commands.push(line.to_string());
            self.last_exit = self
                .exit_codes
                .get(line)
                .copied()
                .unwrap_or(self.default_exit);
            self.outputs
                .get(line)
                .map(|out| format!("{}\n", out.trim_end_matches('\n')))
                .unwrap_or_default()
        };
        self.screen = format!("{} {line}\n{output}{}", self.screen, self.prompt);
    }
}

fn status_token(line: &str) -> Option<&str> {
    line.strip_prefix("echo ")?.strip_suffix(" $?")
}

#[async_trait]
impl Multiplexer for ScriptedShell {
    async fn has_session(&self) -> bool {
        self.inner.lock().session
    }

    async fn send_keys(&self, keys: &str) -> Result<(), ActionError> {
        let mut inner = self.inner.lock();
        inner.sent.push(keys.to_string());

        if keys.starts_with('^') {
            inner.line.clear();
            return Ok(());
        }
        for ch in keys.chars() {
            if ch == '\n' {
                let line = std::mem::take(&mut inner.line);
                inner.run_line(&line);
            } else {
                inner.line.push(ch);
            }
        }
        Ok(())
    }

    async fn capture_pane(&self) -> Result<String, ActionError> {
        Ok(self.inner.lock().screen.clone())
    }

    async fn new_window(&self) -> Result<(), ActionError> {
        let mut inner = self.inner.lock();
        inner.windows_opened += 1;
        if let Some(screen) = inner.screen_after_new_window.take() {
            inner.screen = screen;
        }
        Ok(())
    }

    async fn run(&self, args: &[String]) -> Result<String, ActionError> {
        self.inner.lock().tmux_runs.push(args.to_vec());
        Ok(String::new())
    }
}

// =============================================================================
// Recording Desktop
// =============================================================================

/// A desktop side effect
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DesktopEvent {
    /// A workspace was focused
    Focus(Focus),
    /// The slideshow was synced to a slide
    Sync(usize),
    /// A URL was opened
    Open(String),
}

/// [`Desktop`] that records what it was asked to do
#[derive(Clone, Debug, Default)]
pub struct RecordingDesktop {
    events: Arc<Mutex<Vec<DesktopEvent>>>,
}

impl RecordingDesktop {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<DesktopEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl Desktop for RecordingDesktop {
    async fn focus(&self, focus: Focus) -> Result<(), ActionError> {
        self.events.lock().push(DesktopEvent::Focus(focus));
        Ok(())
    }

    async fn sync_slide(&self, number: usize) -> Result<(), ActionError> {
        self.events.lock().push(DesktopEvent::Sync(number));
        Ok(())
    }

    async fn open_url(&self, url: &str) -> Result<(), ActionError> {
        self.events.lock().push(DesktopEvent::Open(url.to_string()));
        Ok(())
    }
}

// =============================================================================
// Scripted Operator
// =============================================================================

/// [`Operator`] replaying a fixed list of commands, then quitting
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    commands: VecDeque<Command>,
    /// Cursor `(slide, snippet)` at every prompt
    pub seen: Vec<(usize, usize)>,
    /// Messages acknowledged
    pub acknowledged: Vec<String>,
}

impl ScriptedOperator {
    /// Replay `commands` in order
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn command(&mut self, view: &StepView<'_>) -> Command {
        self.seen.push((view.state.slide, view.state.snippet));
        self.commands.pop_front().unwrap_or(Command::Quit)
    }

    async fn acknowledge(&mut self, message: &str) {
        self.acknowledged.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_runs_completed_lines() {
        let shell = ScriptedShell::new();
        shell.respond("whoami", "docker");
        shell.send_keys("who").await.unwrap();
        shell.send_keys("ami\n").await.unwrap();
        assert_eq!(shell.commands(), vec!["whoami"]);
        assert_eq!(shell.screen(), "$ whoami\ndocker\n$");
    }

    #[tokio::test]
    async fn test_status_echo_reports_last_exit() {
        let shell = ScriptedShell::new();
        shell.fail("false", 1);
        shell.send_keys("false\n").await.unwrap();
        shell.send_keys("echo abc $?\n").await.unwrap();
        assert!(shell.screen().contains("\nabc 1\n$"));
        assert_eq!(shell.commands(), vec!["false"]);
    }
}
