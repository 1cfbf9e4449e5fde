//! Architectural Enforcement Integration Tests
//!
//! Source scans that keep the playback crates honest:
//! - Only the pacer sleeps, and never on a thread
//! - Terminal and desktop commands go through `tokio::process`
//! - File I/O during playback is async
//! - Doc comment code fences nest and close
//!
//! The helpers here find production sources and hand back their lines with
//! comments and `#[cfg(test)]` modules already removed.

use std::fs;
use std::path::{Path, PathBuf};

/// Source directories of the production crates, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["autopilot/core/src", "autopilot/console/src"];

/// A line of production code
#[derive(Clone, Debug)]
pub struct SourceLine {
    /// File the line came from
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Code with any trailing `//` comment removed
    pub code: String,
}

impl SourceLine {
    /// File name without directories (`pacer.rs`)
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// `path:line - code`, for violation reports
    pub fn describe(&self) -> String {
        format!(
            "{}:{} - {}",
            self.path.display(),
            self.number,
            self.code.trim()
        )
    }
}

/// Workspace root (two levels above this crate)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Every `.rs` file under `dir`
///
/// # Panics
///
/// Panics if `dir` does not exist, so a moved crate cannot silently pass.
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    assert!(dir.is_dir(), "source directory missing: {}", dir.display());

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// Production lines of one file
///
/// Reading stops at the first `#[cfg(test)]`; by convention test modules sit
/// at the bottom of the file.
pub fn production_lines(path: &Path) -> Vec<SourceLine> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }
        let code = line.split("//").next().unwrap_or(line);
        lines.push(SourceLine {
            path: path.to_path_buf(),
            number: idx + 1,
            code: code.to_string(),
        });
    }
    lines
}

/// Production lines of every crate in [`PRODUCTION_DIRS`]
pub fn all_production_lines() -> Vec<SourceLine> {
    let root = workspace_root();
    PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| rust_files(&root.join(dir)))
        .flat_map(|file| production_lines(&file))
        .collect()
}

/// Code fences in `//!` and `///` comments that rustdoc would misread
///
/// A fence of N backticks is closed by the first bare line of N backticks.
/// A tagged fence of the same width inside an open block (```` ```bash ````
/// inside ```` ``` ````) closes the outer block early instead of nesting, so
/// it is reported along with any fence left open at the end of the file.
pub fn doc_fence_problems(path: &Path) -> Vec<String> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };

    let mut problems = Vec::new();
    let mut open: Option<(usize, usize)> = None;
    for (idx, line) in content.lines().enumerate() {
        let Some(doc) = doc_text(line) else {
            continue;
        };
        let ticks = doc.bytes().take_while(|&b| b == b'`').count();
        if ticks < 3 {
            continue;
        }
        let tag = doc[ticks..].trim();
        match open {
            None => open = Some((ticks, idx + 1)),
            Some((width, _)) if ticks == width && tag.is_empty() => open = None,
            Some((width, start)) if ticks == width => problems.push(format!(
                "{}:{} - `{tag}` fence inside the block opened at line {start}",
                path.display(),
                idx + 1
            )),
            Some(_) => {}
        }
    }
    if let Some((_, start)) = open {
        problems.push(format!("{}:{start} - fence never closed", path.display()));
    }
    problems
}

fn doc_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix("//!")
        .or_else(|| trimmed.strip_prefix("///"))?;
    Some(rest.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_modules_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sample.rs");
        fs::write(
            &file,
            "// tokio::time::sleep in a comment\nfn a() {}\n#[cfg(test)]\nmod tests {}\n",
        )
        .unwrap();

        let lines = production_lines(&file);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].number, 2);
        assert_eq!(lines[0].file_name(), "sample.rs");
    }

    #[test]
    fn test_nested_doc_fence_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("deck.rs");
        fs::write(
            &file,
            "//! ```\n//! .exercise[\n//! ```bash\n//! ls\n//! ```\n//! ]\n//! ```\nfn a() {}\n",
        )
        .unwrap();

        let problems = doc_fence_problems(&file);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].ends_with("deck.rs:3 - `bash` fence inside the block opened at line 1"));
        assert!(problems[1].ends_with("deck.rs:7 - fence never closed"));
    }

    #[test]
    fn test_wider_outer_doc_fence_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("deck.rs");
        fs::write(
            &file,
            "//! ````text\n//! ```bash\n//! ls\n//! ```\n//! ````\n/// ```toml\n/// a = 1\n/// ```\n",
        )
        .unwrap();

        assert!(doc_fence_problems(&file).is_empty());
    }

    #[test]
    fn test_unclosed_doc_fence_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("open.rs");
        fs::write(&file, "fn a() {}\n/// ```text\n/// x\n").unwrap();

        let problems = doc_fence_problems(&file);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].ends_with("open.rs:2 - fence never closed"));
    }

    #[test]
    fn test_production_dirs_exist() {
        for dir in PRODUCTION_DIRS {
            assert!(!rust_files(&workspace_root().join(dir)).is_empty());
        }
    }
}
