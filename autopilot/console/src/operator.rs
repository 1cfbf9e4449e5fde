//! Console Operator
//!
//! Draws each step and turns key presses into playback commands. Keys come
//! from a reader task fed by crossterm's `EventStream`; while a snippet is
//! executing or the session runs unattended, the reader interrupts the pacer
//! instead of queueing the key.

use std::io::{self, Write};

use async_trait::async_trait;
use crossterm::cursor::MoveTo;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::queue;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use autopilot_core::{Command, Operator, Pacer, StepView};

use crate::keys::{map_key, KeyAction};
use crate::screen;

/// Start reading the keyboard
///
/// A key pressed while `pacer` is armed interrupts the running snippet and is
/// consumed. Every other key press is forwarded on the returned channel.
pub fn spawn_key_reader(pacer: Pacer) -> mpsc::Receiver<KeyEvent> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(event) = events.next().await {
            match event {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if pacer.interrupt() {
                        debug!(key = ?key.code, "Interrupted playback");
                        continue;
                    }
                    if tx.send(key).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Terminal input failed");
                    break;
                }
            }
        }
    });

    rx
}

/// [`Operator`] backed by the terminal
pub struct ConsoleOperator {
    keys: mpsc::Receiver<KeyEvent>,
}

impl ConsoleOperator {
    /// Read commands from `keys`
    pub fn new(keys: mpsc::Receiver<KeyEvent>) -> Self {
        Self { keys }
    }

    fn draw(&self, text: &str) -> io::Result<()> {
        let mut out = io::stdout();
        queue!(out, Clear(ClearType::All), MoveTo(0, 0), Print(text))?;
        out.flush()
    }

    fn print(&self, text: &str) {
        let mut out = io::stdout();
        if let Err(e) = queue!(out, Print(text)).and_then(|()| out.flush()) {
            warn!(error = %e, "Could not write to terminal");
        }
    }

    /// Read a slide number, or `None` when the operator backs out
    async fn read_slide_number(&mut self) -> Option<usize> {
        let mut digits = String::new();
        self.print("Enter slide number: ");

        loop {
            let key = self.keys.recv().await?;
            match key.code {
                KeyCode::Char(ch) if ch.is_ascii_digit() => {
                    digits.push(ch);
                    self.print(&ch.to_string());
                }
                KeyCode::Backspace => {
                    if digits.pop().is_some() {
                        self.print("\u{8} \u{8}");
                    }
                }
                KeyCode::Enter => {
                    self.print("\r\n");
                    return digits.parse().ok();
                }
                KeyCode::Esc => {
                    self.print("\r\n");
                    return None;
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl Operator for ConsoleOperator {
    fn observe(&mut self, view: &StepView<'_>) {
        let width = terminal::size().map_or(80, |(cols, _)| cols);
        if let Err(e) = self.draw(&screen::render(view, width)) {
            warn!(error = %e, "Could not draw step");
        }
    }

    async fn command(&mut self, _view: &StepView<'_>) -> Command {
        loop {
            let Some(key) = self.keys.recv().await else {
                return Command::Quit;
            };
            match map_key(key.code, key.modifiers) {
                KeyAction::Command(command) => return command,
                KeyAction::PromptSlide => {
                    if let Some(slide) = self.read_slide_number().await {
                        return Command::GoTo { slide, snippet: 0 };
                    }
                }
                KeyAction::Ignore => {}
            }
        }
    }

    async fn acknowledge(&mut self, message: &str) {
        self.print(&format!("\r\n{message}\r\n"));
        let _ = self.keys.recv().await;
    }
}
