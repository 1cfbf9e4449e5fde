//! Deck Parsing
//!
//! Turns a remark-style markdown document into slides and snippets.
//!
//! # Format
//!
//! ````text
//! excludedClasses: [in-person, extra-details]     <- front matter, one line
//! ---
//! class: title
//! # Slide one
//! .exercise[
//! - Start a container:
//! ```bash
//! docker run -d nginx
//! ```
//! ]
//! ???
//! Speaker notes, never executed
//! --
//! # Slide two (incremental slides use `--`)
//! ````
//!
//! # Exclusion and numbering
//!
//! Slides whose `class:` line names an excluded class are dropped before
//! numbering. Retained slides are numbered contiguously from 1, the same way
//! the slideshow in the browser numbers them, so slide sync and the saved
//! cursor agree. Each slide remembers its raw position in `source_index`.

mod scan;
mod slide;
mod snippet;

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::DeckError;

pub use scan::{exercise_regions, fenced_blocks, Fences, EXERCISE_MARKER, FENCE};
pub use slide::{Slide, NOTES_SEPARATOR};
pub use snippet::{Method, Snippet};

fn slide_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n---?\n").expect("valid slide separator regex"))
}

fn excluded_classes_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"excludedClasses:\s*\[(.*)\]").expect("valid front matter regex"))
}

fn class_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*class:\s*(.*)$").expect("valid class regex"))
}

/// A parsed deck
#[derive(Clone, Debug, Serialize)]
pub struct Deck {
    slides: Vec<Slide>,
    excluded_classes: Vec<String>,
    excluded_slides: usize,
}

impl Deck {
    /// Parse a deck using only the front matter's excluded classes
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Empty`] when no slide is left.
    pub fn parse(text: &str) -> Result<Self, DeckError> {
        Self::parse_with_exclusions(text, &[])
    }

    /// Parse a deck, excluding `extra` classes on top of the front matter's
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Empty`] when no slide is left.
    pub fn parse_with_exclusions(text: &str, extra: &[String]) -> Result<Self, DeckError> {
        let mut excluded_classes = front_matter_exclusions(text);
        for class in extra {
            if !excluded_classes.contains(class) {
                excluded_classes.push(class.clone());
            }
        }
        let excluded: HashSet<&str> = excluded_classes.iter().map(String::as_str).collect();

        let mut slides = Vec::new();
        let mut excluded_slides = 0;
        for (i, raw) in slide_separator().split(text).enumerate() {
            let classes = slide_classes(raw);
            if classes.iter().any(|c| excluded.contains(c.as_str())) {
                debug!(source_index = i + 1, classes = ?classes, "Skipping excluded slide");
                excluded_slides += 1;
                continue;
            }
            slides.push(Slide::parse(slides.len() + 1, i + 1, raw, classes));
        }

        if slides.is_empty() {
            return Err(DeckError::Empty { excluded: excluded_classes });
        }

        Ok(Self {
            slides,
            excluded_classes,
            excluded_slides,
        })
    }

    /// Number of playable slides
    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Always false for a parsed deck; kept for API symmetry with `len`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// All slides in playback order
    #[must_use]
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Slide by playback number (1-based)
    #[must_use]
    pub fn slide(&self, number: usize) -> Option<&Slide> {
        number.checked_sub(1).and_then(|i| self.slides.get(i))
    }

    /// Classes excluded while parsing
    #[must_use]
    pub fn excluded_classes(&self) -> &[String] {
        &self.excluded_classes
    }

    /// How many raw slides were dropped by exclusion
    #[must_use]
    pub fn excluded_slides(&self) -> usize {
        self.excluded_slides
    }

    /// Total number of snippets across the deck
    #[must_use]
    pub fn snippet_count(&self) -> usize {
        self.slides.iter().map(|s| s.snippets.len()).sum()
    }

    /// Flat 0-based step number of a snippet (slide and snippet are 1-based)
    #[must_use]
    pub fn step_of(&self, slide: usize, snippet: usize) -> Option<usize> {
        let target = self.slide(slide)?.snippet(snippet)?;
        let before: usize = self.slides[..slide - 1]
            .iter()
            .map(|s| s.snippets.len())
            .sum();
        Some(before + target.index - 1)
    }

    /// Cursor `(slide, snippet)` of a flat 0-based step number
    #[must_use]
    pub fn cursor_for_step(&self, step: usize) -> Option<(usize, usize)> {
        let mut remaining = step;
        for slide in &self.slides {
            if remaining < slide.snippets.len() {
                return Some((slide.number, remaining + 1));
            }
            remaining -= slide.snippets.len();
        }
        None
    }
}

/// Classes listed on the front matter's `excludedClasses: [...]` line
///
/// The array literal must sit on a single line.
fn front_matter_exclusions(text: &str) -> Vec<String> {
    excluded_classes_line()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|list| split_class_list(list.as_str()))
        .unwrap_or_default()
}

fn slide_classes(raw: &str) -> Vec<String> {
    class_line()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|list| split_class_list(list.as_str()))
        .unwrap_or_default()
}

fn split_class_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|c| c.trim().trim_matches(|ch| ch == '"' || ch == '\''))
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DECK: &str = "\
excludedClasses: [\"in-person\", 'extra-details']
---
class: title
# Welcome
---
# Run something
.exercise[
- Start:
```bash
docker run -d nginx
```
```wait
Status: Downloaded
```
]
---
class: in-person
# Only for classrooms
.exercise[```bash
echo classroom```]
--
# Wrap up
.exercise[
```keys ^C```
]
???
.exercise[```bash
never```]";

    #[test]
    fn test_spec_example_single_snippet() {
        let deck = Deck::parse(".exercise[```bash\necho hi\n```]").unwrap();
        assert_eq!(deck.len(), 1);
        let slide = deck.slide(1).unwrap();
        assert_eq!(slide.snippets.len(), 1);
        assert_eq!(slide.snippets[0].method, Method::Bash);
        assert_eq!(slide.snippets[0].data, "echo hi");
    }

    #[test]
    fn test_front_matter_exclusions() {
        assert_eq!(
            front_matter_exclusions(DECK),
            vec!["in-person".to_string(), "extra-details".to_string()]
        );
    }

    #[test]
    fn test_excluded_slides_keep_numbering_contiguous() {
        let deck = Deck::parse(DECK).unwrap();
        assert_eq!(deck.excluded_slides(), 1);
        // front matter, welcome, run something, wrap up
        assert_eq!(deck.len(), 4);
        let numbers: Vec<usize> = deck.slides().iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        let wrap_up = deck.slide(4).unwrap();
        assert_eq!(wrap_up.source_index, 5);
        assert_eq!(wrap_up.snippets[0].slide, 4);
    }

    #[test]
    fn test_extra_exclusions_from_caller() {
        let deck = Deck::parse_with_exclusions(DECK, &["title".to_string()]).unwrap();
        assert_eq!(deck.len(), 3);
        assert!(deck.excluded_classes().contains(&"title".to_string()));
    }

    #[test]
    fn test_snippet_counts_and_links() {
        let deck = Deck::parse(DECK).unwrap();
        let run = deck.slide(3).unwrap();
        assert_eq!(run.snippets.len(), 2);
        assert_eq!(run.snippets[0].next, Some(2));
        assert_eq!(run.snippets[1].method, Method::Wait);
        assert_eq!(run.snippets[1].data, "Status: Downloaded");

        // notes after ??? are not executed
        let wrap_up = deck.slide(4).unwrap();
        assert_eq!(wrap_up.snippets.len(), 1);
        assert_eq!(wrap_up.snippets[0].method, Method::Keys);
        assert_eq!(deck.snippet_count(), 3);
    }

    #[test]
    fn test_two_dash_separator() {
        let deck = Deck::parse("a\n--\nb\n---\nc").unwrap();
        assert_eq!(deck.len(), 3);
    }

    #[test]
    fn test_step_addressing() {
        let deck = Deck::parse(DECK).unwrap();
        assert_eq!(deck.step_of(3, 1), Some(0));
        assert_eq!(deck.step_of(3, 2), Some(1));
        assert_eq!(deck.step_of(4, 1), Some(2));
        assert_eq!(deck.step_of(1, 1), None);
        assert_eq!(deck.cursor_for_step(2), Some((4, 1)));
        assert_eq!(deck.cursor_for_step(0), Some((3, 1)));
        assert_eq!(deck.cursor_for_step(3), None);
    }

    #[test]
    fn test_everything_excluded_is_an_error() {
        let result = Deck::parse("excludedClasses: [a]\nclass: a");
        assert!(matches!(result, Err(DeckError::Empty { .. })));
    }
}
