//! State Persistence
//!
//! Saves [`PlaybackState`] as TOML after every step so an interrupted session
//! resumes where it stopped. Loading never fails: a missing or unreadable
//! document falls back to defaults with a warning.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::deck::Deck;
use crate::error::StateError;
use crate::state::PlaybackState;

/// Where the playback state lives on disk
#[derive(Clone, Debug)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The state file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved state for `deck`, or `None` when there is nothing usable
    ///
    /// A loaded state always comes back interactive, so the operator regains
    /// control after an unattended run stopped on an error. Legacy documents
    /// holding a flat `next_step` are converted to a cursor, and the cursor is
    /// clamped to the deck.
    pub async fn load(&self, deck: &Deck) -> Option<PlaybackState> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved state, using defaults");
                return None;
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not read state file, using defaults"
                );
                return None;
            }
        };

        let mut state: PlaybackState = match toml::from_str(&text) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not parse state file, using defaults"
                );
                return None;
            }
        };

        if let Some(step) = state.next_step.take() {
            match deck.cursor_for_step(step) {
                Some((slide, snippet)) => {
                    state.slide = slide;
                    state.snippet = snippet;
                }
                None => warn!(step, "Saved step is past the end of the deck"),
            }
        }

        state.interactive = true;
        state.check_bounds(deck);
        debug!(slide = state.slide, snippet = state.snippet, "Restored playback state");
        Some(state)
    }

    /// Load saved state, falling back to defaults
    pub async fn load_or_default(&self, deck: &Deck) -> PlaybackState {
        self.load(deck).await.unwrap_or_default()
    }

    /// Write the state, replacing the previous document atomically
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized or written.
    pub async fn save(&self, state: &PlaybackState) -> Result<(), StateError> {
        let text = toml::to_string(state)?;
        let tmp = self.temp_path();

        tokio::fs::write(&tmp, text)
            .await
            .map_err(|source| StateError::Write {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StateError::Write {
                path: self.path.clone(),
                source,
            })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn deck() -> Deck {
        Deck::parse(".exercise[```bash\na``````bash\nb```]\n---\n.exercise[```bash\nc```]").unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_forces_interactive() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.toml"));
        let deck = deck();

        let mut state = PlaybackState::new();
        state.interactive = false;
        state.simulate_type = true;
        state.verify_status = false;
        state.clipboard = "10.0.0.1".to_string();
        state.node_address = Some("10.0.0.1".to_string());
        state.go_to(&deck, 2, 1);
        store.save(&state).await.unwrap();

        let loaded = store.load(&deck).await.unwrap();
        let mut expected = state.clone();
        expected.interactive = true;
        assert_eq!(loaded, expected);
        assert!(!dir.path().join("state.toml.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("nope.toml"));
        assert!(store.load(&deck()).await.is_none());
        assert_eq!(store.load_or_default(&deck()).await, PlaybackState::default());
    }

    #[tokio::test]
    async fn test_garbage_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "slide = \"not a number\"\n[[[").unwrap();
        let store = StateStore::new(&path);
        assert_eq!(store.load_or_default(&deck()).await, PlaybackState::default());
    }

    #[tokio::test]
    async fn test_legacy_next_step_is_converted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "interactive = false\nverify_status = false\nnext_step = 2\n").unwrap();
        let store = StateStore::new(&path);

        let state = store.load(&deck()).await.unwrap();
        assert_eq!((state.slide, state.snippet), (2, 1));
        assert!(state.interactive);
        assert!(!state.verify_status);
        assert_eq!(state.next_step, None);
    }

    #[tokio::test]
    async fn test_loaded_cursor_is_clamped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "slide = 40\nsnippet = 9\n").unwrap();
        let store = StateStore::new(&path);

        let state = store.load(&deck()).await.unwrap();
        assert_eq!((state.slide, state.snippet), (2, 1));
    }
}
