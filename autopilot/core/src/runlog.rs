//! Run Log
//!
//! Append-only record of every executed snippet, one line each:
//!
//! ```text
//! 2024-05-01T10:00:00+02:00 OK STEP=3 SLIDE=12 SNIPPET=1 METHOD=bash DATA="docker ps"
//! 2024-05-01T10:01:00+02:00 ERR[timeout] STEP=4 SLIDE=12 SNIPPET=2 METHOD=bash DATA="docker run -ti alpine"
//! 2024-05-01T10:02:00+02:00 INT STEP=5 SLIDE=13 SNIPPET=1 METHOD=bash DATA="docker logs -f web"
//! ```
//!
//! `INT` marks a snippet the operator cut short; its command may have been
//! typed only in part.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;

use crate::deck::Snippet;
use crate::error::ActionError;

/// One run log line
#[derive(Clone, Debug)]
pub struct RunRecord<'a> {
    /// When the snippet finished
    pub at: DateTime<Local>,
    /// Flat step number, when the snippet is addressable
    pub step: Option<usize>,
    /// The executed snippet
    pub snippet: &'a Snippet,
    /// Failure, if any
    pub error: Option<&'a ActionError>,
    /// The operator interrupted the snippet
    pub interrupted: bool,
}

impl RunRecord<'_> {
    /// Render the record as a log line (without the newline)
    #[must_use]
    pub fn line(&self) -> String {
        let result = match self.error {
            Some(e) => format!("ERR[{}]", e.kind()),
            None if self.interrupted => "INT".to_string(),
            None => "OK".to_string(),
        };
        let step = self
            .step
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        format!(
            "{} {} STEP={} SLIDE={} SNIPPET={} METHOD={} DATA={:?}",
            self.at.to_rfc3339(),
            result,
            step,
            self.snippet.slide,
            self.snippet.index,
            self.snippet.method,
            self.snippet.data,
        )
    }
}

/// Append-only run log file
#[derive(Clone, Debug)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Log to `path`, creating it on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record and flush it
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub async fn append(&self, record: &RunRecord<'_>) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut line = record.line();
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
