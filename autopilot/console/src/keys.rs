//! Key Bindings
//!
//! Maps a key press to a playback command. The mapping is pure so it can be
//! tested without a terminal.

use crossterm::event::{KeyCode, KeyModifiers};

use autopilot_core::{Command, Toggle};

/// What a key press means to the console
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Hand a command to the playback loop
    Command(Command),
    /// Start reading a slide number (`g`)
    PromptSlide,
    /// Nothing to do (modifier-only presses and the like)
    Ignore,
}

/// Help lines shown under the slide while waiting for a command
pub const HELP: &[&str] = &[
    "y/⎵/⏎ execute snippet or advance to next snippet",
    "p/← previous snippet   n/→ next snippet   g go to a slide",
    "s simulate typing   v verify status   d switch desktop   k sync slides",
    "o open links   h run hidden   c continue non-interactively   q quit",
];

/// Translate a key press
pub fn map_key(code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c' | 'd') => KeyAction::Command(Command::Quit),
            _ => KeyAction::Ignore,
        };
    }

    let command = match code {
        KeyCode::Char('y' | ' ') | KeyCode::Enter => Command::Execute,
        KeyCode::Char('n') | KeyCode::Right => Command::Next,
        KeyCode::Char('p') | KeyCode::Left => Command::Previous,
        KeyCode::Char('s') => Command::Toggle(Toggle::SimulateTyping),
        KeyCode::Char('v') => Command::Toggle(Toggle::VerifyStatus),
        KeyCode::Char('d') => Command::Toggle(Toggle::SwitchDesktop),
        KeyCode::Char('k') => Command::Toggle(Toggle::SyncSlides),
        KeyCode::Char('o') => Command::Toggle(Toggle::OpenLinks),
        KeyCode::Char('h') => Command::Toggle(Toggle::RunHidden),
        KeyCode::Char('c') => Command::Continue,
        KeyCode::Char('q') => Command::Quit,
        KeyCode::Char('g') => return KeyAction::PromptSlide,
        KeyCode::Char(other) => Command::Unrecognized(other.to_string()),
        KeyCode::Modifier(_) | KeyCode::Null => return KeyAction::Ignore,
        other => Command::Unrecognized(format!("{other:?}")),
    };
    KeyAction::Command(command)
}
