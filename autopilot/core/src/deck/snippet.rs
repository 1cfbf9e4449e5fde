//! Snippets
//!
//! A snippet is something the workshop attendee is supposed to do: usually a
//! shell command, sometimes keystrokes or a screen copy. In the deck source
//! they are the fenced code blocks inside `.exercise[]` regions.

use std::ops::Range;

use serde::{Serialize, Serializer};

/// What a snippet does when it is executed
///
/// Resolved once at parse time from the first word of the fenced block.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// Type a shell command, wait for it, verify its exit status
    Bash,
    /// Like `Bash`, but only when hidden commands are enabled
    Hide,
    /// Type keystrokes (honours simulated typing)
    Keys,
    /// Send a single tmux key token (`^C`, `Space`, ...)
    Key,
    /// Copy the last regex match on screen into the clipboard
    Copy,
    /// Type the clipboard
    Paste,
    /// Copy the last regex match on screen and run it as a command
    CopyPaste,
    /// Wait for a prompt and verify the previous exit status
    Check,
    /// Open a URL in the browser
    Open,
    /// Run a raw tmux command
    Tmux,
    /// Lookahead: the previous command is done when this string shows up
    Wait,
    /// Same as `Wait` with the long timeout
    LongWait,
    /// Anything else; executed as a no-op with a warning
    Unknown(String),
}

impl Method {
    /// Resolve a method name from a fenced block header
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "bash" => Self::Bash,
            "hide" => Self::Hide,
            "keys" => Self::Keys,
            "key" => Self::Key,
            "copy" => Self::Copy,
            "paste" => Self::Paste,
            "copypaste" => Self::CopyPaste,
            "check" => Self::Check,
            "open" => Self::Open,
            "tmux" => Self::Tmux,
            "wait" => Self::Wait,
            "longwait" => Self::LongWait,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The name as written in the deck
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bash => "bash",
            Self::Hide => "hide",
            Self::Keys => "keys",
            Self::Key => "key",
            Self::Copy => "copy",
            Self::Paste => "paste",
            Self::CopyPaste => "copypaste",
            Self::Check => "check",
            Self::Open => "open",
            Self::Tmux => "tmux",
            Self::Wait => "wait",
            Self::LongWait => "longwait",
            Self::Unknown(name) => name,
        }
    }

    /// Whether this method only exists as lookahead for the previous snippet
    #[must_use]
    pub fn is_lookahead(&self) -> bool {
        matches!(self, Self::Wait | Self::LongWait)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One executable unit of a slide
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snippet {
    /// Number of the slide this snippet belongs to
    pub slide: usize,
    /// 1-based position within the slide (matches the cursor's snippet index)
    pub index: usize,
    /// What to do
    pub method: Method,
    /// Command text or argument, trimmed
    pub data: String,
    /// Index of the following snippet in the same exercise region
    pub next: Option<usize>,
    /// Byte range of the fenced block body within the slide content
    #[serde(skip)]
    pub span: Range<usize>,
}

impl Snippet {
    /// Build a snippet from the body of a fenced block
    ///
    /// On multi-line blocks the method is alone on the first line. On
    /// single-line blocks the data follows the method after a space.
    #[must_use]
    pub fn from_block(slide: usize, index: usize, body: &str, span: Range<usize>) -> Self {
        let (method, data) = match body.split_once('\n') {
            Some((method, data)) => (method, data),
            None => body.trim().split_once(' ').unwrap_or((body, "")),
        };

        Self {
            slide,
            index,
            method: Method::parse(method),
            data: data.trim().to_string(),
            next: None,
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiline_block() {
        let snippet = Snippet::from_block(3, 1, "bash\n  docker ps\n  docker images\n", 0..0);
        assert_eq!(snippet.method, Method::Bash);
        assert_eq!(snippet.data, "docker ps\n  docker images");
        assert_eq!(snippet.slide, 3);
    }

    #[test]
    fn test_single_line_block() {
        let snippet = Snippet::from_block(1, 2, "keys ^C", 0..0);
        assert_eq!(snippet.method, Method::Keys);
        assert_eq!(snippet.data, "^C");
    }

    #[test]
    fn test_bare_method() {
        let snippet = Snippet::from_block(1, 1, "check", 0..0);
        assert_eq!(snippet.method, Method::Check);
        assert_eq!(snippet.data, "");
    }

    #[test]
    fn test_unknown_method_is_kept() {
        let snippet = Snippet::from_block(1, 1, "yaml\nfoo: bar\n", 0..0);
        assert_eq!(snippet.method, Method::Unknown("yaml".to_string()));
        assert_eq!(snippet.method.as_str(), "yaml");
    }

    #[test]
    fn test_lookahead_methods() {
        assert!(Method::parse("wait").is_lookahead());
        assert!(Method::parse("longwait").is_lookahead());
        assert!(!Method::parse("bash").is_lookahead());
    }
}
