//! Region Scanning
//!
//! Finds `.exercise[ ... ]` regions and the fenced blocks inside them.
//!
//! Regions are matched with an explicit depth counter rather than a greedy
//! regex, so a slide can hold several exercises and a `[` inside a code block
//! (`[ -f foo ]`, `${array[0]}`) does not end the region early.

use std::ops::Range;

/// Marker opening an exercise region
pub const EXERCISE_MARKER: &str = ".exercise[";

/// Code fence delimiter
pub const FENCE: &str = "```";

/// Byte ranges of the bodies of every exercise region in `content`
///
/// An unterminated region extends to the end of the content.
#[must_use]
pub fn exercise_regions(content: &str) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut from = 0;

    while let Some(found) = content[from..].find(EXERCISE_MARKER) {
        let start = from + found + EXERCISE_MARKER.len();
        let end = region_end(content, start).unwrap_or(content.len());
        regions.push(start..end);
        from = (end + 1).min(content.len());
    }

    regions
}

/// Position of the `]` closing a region whose body starts at `start`
fn region_end(content: &str, start: usize) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut depth = 1usize;
    let mut in_fence = false;
    let mut i = start;

    while i < bytes.len() {
        if bytes[i..].starts_with(FENCE.as_bytes()) {
            in_fence = !in_fence;
            i += FENCE.len();
            continue;
        }
        if !in_fence {
            match bytes[i] {
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    None
}

/// Fenced blocks found in one region
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Fences {
    /// Absolute byte ranges of each complete block body
    pub blocks: Vec<Range<usize>>,
    /// Whether a trailing fence was left open
    pub unterminated: bool,
}

/// Byte ranges of fenced block bodies inside `region` of `content`
#[must_use]
pub fn fenced_blocks(content: &str, region: Range<usize>) -> Fences {
    let body = &content[region.clone()];
    let marks: Vec<usize> = body
        .match_indices(FENCE)
        .map(|(at, _)| region.start + at)
        .collect();

    let blocks = marks
        .chunks_exact(2)
        .map(|pair| (pair[0] + FENCE.len())..pair[1])
        .collect();

    Fences {
        blocks,
        unterminated: marks.len() % 2 == 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_region() {
        let content = "intro\n.exercise[\n- Run:\n```bash\nls\n```\n]\noutro";
        let regions = exercise_regions(content);
        assert_eq!(regions.len(), 1);
        assert_eq!(&content[regions[0].clone()], "\n- Run:\n```bash\nls\n```\n");
    }

    #[test]
    fn test_brackets_inside_fence_do_not_close_region() {
        let content = ".exercise[\n```bash\n[ -f x ] && echo ]\n```\n]";
        let regions = exercise_regions(content);
        assert_eq!(regions.len(), 1);
        let fences = fenced_blocks(content, regions[0].clone());
        assert_eq!(fences.blocks.len(), 1);
        assert_eq!(
            &content[fences.blocks[0].clone()],
            "bash\n[ -f x ] && echo ]\n"
        );
    }

    #[test]
    fn test_nested_brackets_in_prose() {
        let content = ".exercise[\n- See [the docs](http://x)\n```keys ^C```\n]tail";
        let regions = exercise_regions(content);
        assert_eq!(regions.len(), 1);
        assert!(content[regions[0].end..].starts_with("]tail"));
    }

    #[test]
    fn test_two_regions() {
        let content = ".exercise[```bash\na```]\ntext\n.exercise[```bash\nb```]";
        let regions = exercise_regions(content);
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn test_unterminated_region_runs_to_end() {
        let content = ".exercise[\n```bash\nls\n```\n";
        let regions = exercise_regions(content);
        assert_eq!(regions, vec![EXERCISE_MARKER.len()..content.len()]);
    }

    #[test]
    fn test_unterminated_fence_is_flagged() {
        let content = ".exercise[```bash\na``` ```bash\nb]";
        let regions = exercise_regions(content);
        let fences = fenced_blocks(content, regions[0].clone());
        assert_eq!(fences.blocks.len(), 1);
        assert!(fences.unterminated);
    }
}
