//! Operator Interface
//!
//! The playback loop asks an [`Operator`] what to do next whenever the session
//! is interactive. Surfaces (the console, tests, an unattended runner) plug in
//! here; the loop never reads a keyboard itself.

use async_trait::async_trait;

use crate::deck::{Deck, Slide, Snippet};
use crate::state::{PlaybackState, Toggle};

/// What the operator asked for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the current snippet, or advance to the next one
    Execute,
    /// Move forward one snippet
    Next,
    /// Move back one snippet
    Previous,
    /// Flip a flag
    Toggle(Toggle),
    /// Jump to a cursor position
    GoTo {
        /// Target slide (1-based)
        slide: usize,
        /// Target snippet (0 = slide start)
        snippet: usize,
    },
    /// Run unattended until the next error
    Continue,
    /// Save and leave
    Quit,
    /// Anything else; logged and ignored
    Unrecognized(String),
}

/// What the operator sees while choosing a command
#[derive(Clone, Copy, Debug)]
pub struct StepView<'a> {
    /// The parsed deck
    pub deck: &'a Deck,
    /// Current slide
    pub slide: &'a Slide,
    /// Current snippet, when the cursor is on one
    pub snippet: Option<&'a Snippet>,
    /// Cursor and flags
    pub state: &'a PlaybackState,
}

impl StepView<'_> {
    /// Number of playable slides
    #[must_use]
    pub fn slide_count(&self) -> usize {
        self.deck.len()
    }
}

/// Source of playback commands
#[async_trait]
pub trait Operator: Send {
    /// Called before every step, interactive or not
    fn observe(&mut self, _view: &StepView<'_>) {}

    /// Show the current step and wait for a command
    async fn command(&mut self, view: &StepView<'_>) -> Command;

    /// Show `message` and wait for any key
    async fn acknowledge(&mut self, message: &str);
}

/// Operator that never intervenes
///
/// Every prompt is answered with [`Command::Continue`], which turns the
/// session non-interactive and lets it run to the end.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unattended;

#[async_trait]
impl Operator for Unattended {
    async fn command(&mut self, _view: &StepView<'_>) -> Command {
        Command::Continue
    }

    async fn acknowledge(&mut self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unattended_always_continues() {
        let deck = Deck::parse(".exercise[```bash\nls```]").unwrap();
        let state = PlaybackState::default();
        let view = StepView {
            deck: &deck,
            slide: &deck.slides()[0],
            snippet: None,
            state: &state,
        };
        assert_eq!(view.slide_count(), 1);

        let mut operator = Unattended;
        let command = tokio_test::block_on(operator.command(&view));
        assert_eq!(command, Command::Continue);
    }
}
