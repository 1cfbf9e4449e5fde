//! Slides

use serde::Serialize;
use tracing::{debug, warn};

use super::scan::{exercise_regions, fenced_blocks};
use super::snippet::Snippet;

/// Separator between slide content and speaker notes (remark.js convention)
pub const NOTES_SEPARATOR: &str = "\n???\n";

/// One section of the deck
#[derive(Clone, Debug, Serialize)]
pub struct Slide {
    /// Playback number (1-based, contiguous over retained slides)
    pub number: usize,
    /// Position in the raw document, counting excluded slides (1-based)
    pub source_index: usize,
    /// Slide text without speaker notes
    pub content: String,
    /// Classes from the slide's `class:` line
    pub classes: Vec<String>,
    /// Executable snippets, in order
    pub snippets: Vec<Snippet>,
}

impl Slide {
    /// Build a slide from its raw text
    ///
    /// Speaker notes are cut off before looking for snippets, so commands in
    /// the notes never run.
    #[must_use]
    pub fn parse(number: usize, source_index: usize, raw: &str, classes: Vec<String>) -> Self {
        let content = raw
            .split(NOTES_SEPARATOR)
            .next()
            .unwrap_or_default()
            .to_string();

        let mut snippets: Vec<Snippet> = Vec::new();
        for region in exercise_regions(&content) {
            let fences = fenced_blocks(&content, region);
            if fences.unterminated {
                warn!(slide = number, "Exercise has an unterminated ``` block, ignoring it");
            }
            if fences.blocks.is_empty() {
                warn!(slide = number, "Exercise does not have any ``` snippet");
                debug!(slide = number, content = %content, "Slide without snippets");
                continue;
            }

            let first = snippets.len();
            for span in fences.blocks {
                let index = snippets.len() + 1;
                snippets.push(Snippet::from_block(
                    number,
                    index,
                    &content[span.clone()],
                    span,
                ));
            }
            // Link consecutive blocks of this region only
            for i in first..snippets.len().saturating_sub(1) {
                snippets[i].next = Some(snippets[i + 1].index);
            }
        }

        Self {
            number,
            source_index,
            content,
            classes,
            snippets,
        }
    }

    /// Snippet at a 1-based index
    #[must_use]
    pub fn snippet(&self, index: usize) -> Option<&Snippet> {
        index.checked_sub(1).and_then(|i| self.snippets.get(i))
    }

    /// The snippet following `snippet` in its exercise region
    #[must_use]
    pub fn next_of(&self, snippet: &Snippet) -> Option<&Snippet> {
        snippet.next.and_then(|index| self.snippet(index))
    }

    /// Whether this slide has anything to execute
    #[must_use]
    pub fn has_snippets(&self) -> bool {
        !self.snippets.is_empty()
    }

    /// Split the content around a snippet's block, for highlighting
    ///
    /// Returns `(before, block, after)`; the whole content lands in `before`
    /// when the snippet does not belong to this slide.
    #[must_use]
    pub fn split_around(&self, snippet: &Snippet) -> (&str, &str, &str) {
        let span = &snippet.span;
        if snippet.slide != self.number || span.end > self.content.len() {
            return (&self.content, "", "");
        }
        (
            &self.content[..span.start],
            &self.content[span.clone()],
            &self.content[span.end..],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Method;

    #[test]
    fn test_notes_are_not_scanned() {
        let raw = "# Title\n.exercise[```bash\nls```]\n???\n.exercise[```bash\nrm -rf /```]";
        let slide = Slide::parse(1, 1, raw, Vec::new());
        assert_eq!(slide.snippets.len(), 1);
        assert_eq!(slide.snippets[0].data, "ls");
        assert!(!slide.content.contains("rm -rf"));
    }

    #[test]
    fn test_exercise_without_fences_yields_nothing() {
        let slide = Slide::parse(2, 2, ".exercise[\n- Just read this\n]", Vec::new());
        assert!(!slide.has_snippets());
    }

    #[test]
    fn test_next_links_stay_inside_region() {
        let raw = ".exercise[```bash\na``` ```wait\nb```]\n.exercise[```bash\nc```]";
        let slide = Slide::parse(1, 1, raw, Vec::new());
        assert_eq!(slide.snippets.len(), 3);
        assert_eq!(slide.snippets[0].next, Some(2));
        assert_eq!(slide.next_of(&slide.snippets[0]).unwrap().method, Method::Wait);
        assert_eq!(slide.snippets[1].next, None);
        assert_eq!(slide.snippets[2].next, None);
    }

    #[test]
    fn test_split_around_highlights_block() {
        let raw = "Run this:\n.exercise[```bash\nls```]";
        let slide = Slide::parse(1, 1, raw, Vec::new());
        let (before, block, after) = slide.split_around(&slide.snippets[0]);
        assert_eq!(block, "bash\nls");
        assert!(before.ends_with("```"));
        assert!(after.starts_with("```"));
    }

    #[test]
    fn test_snippet_lookup_is_one_based() {
        let slide = Slide::parse(1, 1, ".exercise[```keys a``````keys b```]", Vec::new());
        assert!(slide.snippet(0).is_none());
        assert_eq!(slide.snippet(1).unwrap().data, "a");
        assert_eq!(slide.snippet(2).unwrap().data, "b");
        assert!(slide.snippet(3).is_none());
    }
}
