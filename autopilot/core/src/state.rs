//! Playback State
//!
//! The cursor plus the operator's toggles. Owned and mutated by the playback
//! loop only; persisted by [`crate::store::StateStore`] after every step.
//!
//! # Cursor
//!
//! `slide` is 1-based. `snippet` is 1-based as well, with `0` meaning "between
//! snippets": on the slide, before its first snippet. Moving forward past the
//! last snippet of a slide lands on the next slide's position 0.

use serde::{Deserialize, Serialize};

use crate::deck::{Deck, Snippet};

/// Operator toggles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    /// Type commands one character at a time
    SimulateTyping,
    /// Check `$?` after every command
    VerifyStatus,
    /// Switch window manager workspaces
    SwitchDesktop,
    /// Keep the browser slideshow on the current slide
    SyncSlides,
    /// Open URLs from `open` snippets
    OpenLinks,
    /// Execute `hide` snippets
    RunHidden,
}

impl Toggle {
    /// Name of the flag, as shown in the header and written to the state file
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SimulateTyping => "simulate_type",
            Self::VerifyStatus => "verify_status",
            Self::SwitchDesktop => "switch_desktop",
            Self::SyncSlides => "sync_slides",
            Self::OpenLinks => "open_links",
            Self::RunHidden => "run_hidden",
        }
    }
}

/// Cursor and flags of a playback session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackState {
    /// Text stored by the last `copy` snippet
    pub clipboard: String,
    /// Ask the operator before each step
    pub interactive: bool,
    /// Check exit status after commands
    pub verify_status: bool,
    /// Simulate typing for `keys` snippets and commands
    pub simulate_type: bool,
    /// Switch workspaces between slides and terminal
    pub switch_desktop: bool,
    /// Drive the browser slideshow to the current slide
    pub sync_slides: bool,
    /// Open URLs from `open` snippets
    pub open_links: bool,
    /// Execute `hide` snippets
    pub run_hidden: bool,
    /// Current slide (1-based)
    pub slide: usize,
    /// Current snippet (1-based, 0 = between snippets)
    pub snippet: usize,
    /// Node address harvested from the last shell prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_address: Option<String>,
    /// Flat step number written by older harness versions
    #[serde(skip_serializing)]
    pub next_step: Option<usize>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            clipboard: String::new(),
            interactive: true,
            verify_status: true,
            simulate_type: false,
            switch_desktop: false,
            sync_slides: false,
            open_links: false,
            run_hidden: true,
            slide: 1,
            snippet: 0,
            node_address: None,
            next_step: None,
        }
    }
}

impl PlaybackState {
    /// Create a fresh state with the cursor on the first slide
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snippet under the cursor, if any
    #[must_use]
    pub fn current<'d>(&self, deck: &'d Deck) -> Option<&'d Snippet> {
        deck.slide(self.slide)?.snippet(self.snippet)
    }

    /// Advance one snippet, wrapping to the start of the next slide
    pub fn move_forward(&mut self, deck: &Deck) {
        self.snippet += 1;
        let count = deck.slide(self.slide).map_or(0, |s| s.snippets.len());
        if self.snippet > count {
            self.slide += 1;
            self.snippet = 0;
        }
        self.check_bounds(deck);
    }

    /// Step back one snippet; from position 0, go to the previous slide's start
    pub fn move_backward(&mut self, deck: &Deck) {
        if self.snippet == 0 {
            self.slide = self.slide.saturating_sub(1);
        } else {
            self.snippet -= 1;
        }
        self.check_bounds(deck);
    }

    /// Jump to a cursor position, clamped to the deck
    pub fn go_to(&mut self, deck: &Deck, slide: usize, snippet: usize) {
        self.slide = slide;
        self.snippet = snippet;
        self.check_bounds(deck);
    }

    /// Clamp the cursor into the deck
    pub fn check_bounds(&mut self, deck: &Deck) {
        self.slide = self.slide.clamp(1, deck.len().max(1));
        let count = deck.slide(self.slide).map_or(0, |s| s.snippets.len());
        if self.snippet > count {
            self.snippet = count;
        }
    }

    /// Whether any snippet is left at or after the cursor
    ///
    /// Position 0 of a slide counts as "before" that slide's snippets.
    #[must_use]
    pub fn has_work_ahead(&self, deck: &Deck) -> bool {
        if self.current(deck).is_some() {
            return true;
        }
        let here = deck
            .slide(self.slide)
            .is_some_and(|s| self.snippet == 0 && s.has_snippets());
        here || deck.slides().iter().skip(self.slide).any(|s| s.has_snippets())
    }

    /// Flip an operator toggle, returning its new value
    pub fn toggle(&mut self, toggle: Toggle) -> bool {
        let flag = match toggle {
            Toggle::SimulateTyping => &mut self.simulate_type,
            Toggle::VerifyStatus => &mut self.verify_status,
            Toggle::SwitchDesktop => &mut self.switch_desktop,
            Toggle::SyncSlides => &mut self.sync_slides,
            Toggle::OpenLinks => &mut self.open_links,
            Toggle::RunHidden => &mut self.run_hidden,
        };
        *flag = !*flag;
        *flag
    }

    /// Read a toggle's current value
    #[must_use]
    pub fn flag(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::SimulateTyping => self.simulate_type,
            Toggle::VerifyStatus => self.verify_status,
            Toggle::SwitchDesktop => self.switch_desktop,
            Toggle::SyncSlides => self.sync_slides,
            Toggle::OpenLinks => self.open_links,
            Toggle::RunHidden => self.run_hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn deck() -> Deck {
        // slide 1: none, slide 2: two snippets, slide 3: none, slide 4: one
        Deck::parse(
            "title\n---\n.exercise[```bash\na``````bash\nb```]\n---\nprose\n---\n.exercise[```keys x```]",
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let state = PlaybackState::default();
        assert!(state.interactive);
        assert!(state.verify_status);
        assert!(!state.simulate_type);
        assert!(!state.switch_desktop);
        assert!(!state.sync_slides);
        assert!(!state.open_links);
        assert!(state.run_hidden);
        assert_eq!((state.slide, state.snippet), (1, 0));
        assert_eq!(state.clipboard, "");
    }

    #[test]
    fn test_move_forward_wraps_to_next_slide() {
        let deck = deck();
        let mut state = PlaybackState::new();
        state.move_forward(&deck);
        assert_eq!((state.slide, state.snippet), (2, 0));
        state.move_forward(&deck);
        state.move_forward(&deck);
        assert_eq!((state.slide, state.snippet), (2, 2));
        assert_eq!(state.current(&deck).unwrap().data, "b");
        state.move_forward(&deck);
        assert_eq!((state.slide, state.snippet), (3, 0));
    }

    #[test]
    fn test_forward_past_last_slide_is_clamped() {
        let deck = deck();
        let mut state = PlaybackState::new();
        state.go_to(&deck, 4, 1);
        state.move_forward(&deck);
        assert_eq!((state.slide, state.snippet), (4, 0));
        state.move_forward(&deck);
        state.move_forward(&deck);
        assert_eq!(state.slide, 4);
    }

    #[test]
    fn test_backward_from_start_stays_on_first_slide() {
        let deck = deck();
        let mut state = PlaybackState::new();
        state.move_backward(&deck);
        assert_eq!((state.slide, state.snippet), (1, 0));
    }

    #[test]
    fn test_backward_goes_to_previous_slide_start() {
        let deck = deck();
        let mut state = PlaybackState::new();
        state.go_to(&deck, 2, 2);
        state.move_backward(&deck);
        assert_eq!((state.slide, state.snippet), (2, 1));
        state.move_backward(&deck);
        state.move_backward(&deck);
        assert_eq!((state.slide, state.snippet), (1, 0));
    }

    #[test]
    fn test_go_to_is_clamped() {
        let deck = deck();
        let mut state = PlaybackState::new();
        state.go_to(&deck, 99, 7);
        assert_eq!((state.slide, state.snippet), (4, 1));
        state.go_to(&deck, 0, 0);
        assert_eq!((state.slide, state.snippet), (1, 0));
    }

    #[test]
    fn test_work_ahead() {
        let deck = deck();
        let mut state = PlaybackState::new();
        assert!(state.has_work_ahead(&deck));
        state.go_to(&deck, 4, 1);
        assert!(state.has_work_ahead(&deck));
        state.move_forward(&deck);
        // back on position 0 of the last slide, which still has a snippet
        assert!(state.has_work_ahead(&deck));
        state.go_to(&deck, 3, 0);
        assert!(state.has_work_ahead(&deck));

        let prose = Deck::parse("a\n---\nb").unwrap();
        let mut state = PlaybackState::new();
        state.go_to(&prose, 2, 0);
        assert!(!state.has_work_ahead(&prose));
    }

    #[test]
    fn test_toggle_flips_flag() {
        let mut state = PlaybackState::new();
        assert!(state.toggle(Toggle::SimulateTyping));
        assert!(state.flag(Toggle::SimulateTyping));
        assert!(!state.toggle(Toggle::VerifyStatus));
        assert!(!state.verify_status);
        assert!(!state.toggle(Toggle::RunHidden));
    }
}
