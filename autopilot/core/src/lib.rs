//! Autopilot Core - Headless Workshop Deck Replay
//!
//! This crate replays the hands-on exercises of a markdown slide deck into a
//! live shell, the way a presenter would: it types each command into a tmux
//! pane, waits for the shell to come back, and checks the exit status. It has
//! no terminal UI of its own; a surface (the `autopilot` console, a test)
//! drives it through the [`Operator`] trait.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        Surfaces                               │
//! │   ┌───────────────┐   ┌───────────────┐   ┌───────────────┐   │
//! │   │    Console    │   │  Unattended   │   │     Tests     │   │
//! │   │  (crossterm)  │   │    (batch)    │   │  (scripted)   │   │
//! │   └───────┬───────┘   └───────┬───────┘   └───────┬───────┘   │
//! │           └───────────────────┼───────────────────┘           │
//! │                     Command (up) / StepView (down)            │
//! └───────────────────────────────┼───────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┼───────────────────────────────┐
//! │                        AUTOPILOT CORE                         │
//! │  ┌────────────┐  ┌────────────┴───────────┐  ┌─────────────┐  │
//! │  │    Deck    │──│        Playback        │──│ StateStore  │  │
//! │  │  (parser)  │  │    (state machine)     │  │   RunLog    │  │
//! │  └────────────┘  └─────┬────────────┬─────┘  └─────────────┘  │
//! │               ┌────────┴───────┐ ┌──┴──────┐                  │
//! │               │ TerminalDriver │ │ Desktop │                  │
//! │               │  + Pacer       │ │  hooks  │                  │
//! │               └────────┬───────┘ └─────────┘                  │
//! └────────────────────────┼──────────────────────────────────────┘
//!                          │ Multiplexer
//!                        tmux
//! ```
//!
//! # Key Types
//!
//! - [`Deck`]: Parsed slides and their snippets
//! - [`Playback`]: The state machine walking the deck
//! - [`PlaybackState`]: Cursor and operator toggles, persisted every step
//! - [`TerminalDriver`]: Typing, screen polling and exit-status checks
//! - [`Pacer`]: The interruptible sleep all waits go through
//!
//! # Quick Start
//!
//! ```ignore
//! use autopilot_core::{
//!     CommandDesktop, Deck, DriverSettings, Pacer, Playback, RunLog, StateStore,
//!     TerminalDriver, TmuxMultiplexer, Unattended,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let deck = Deck::parse(&std::fs::read_to_string("intro.md").unwrap()).unwrap();
//!     let driver = TerminalDriver::new(
//!         TmuxMultiplexer::new("tmux", None),
//!         DriverSettings::default(),
//!         Pacer::new(),
//!     );
//!     driver.attach().await.unwrap();
//!
//!     let mut playback = Playback::new(
//!         deck,
//!         driver,
//!         Box::new(CommandDesktop::default()),
//!         StateStore::new("state.toml"),
//!         RunLog::new("autopilot.log"),
//!     );
//!     let summary = playback.run(&mut Unattended).await;
//!     println!("{} snippets, {} failed", summary.executed, summary.failed);
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`deck`]: Slide splitting, exercise regions, snippet extraction
//! - [`state`]: Playback cursor and flags
//! - [`store`]: State persistence
//! - [`driver`]: Multiplexer abstraction and terminal operations
//! - [`pacer`]: Interruptible pauses
//! - [`playback`]: The playback loop and snippet actions
//! - [`operator`]: Commands and the operator trait
//! - [`desktop`]: Workspace switching, slide sync, link opening
//! - [`runlog`]: Append-only record of executed snippets
//! - [`config`]: TOML, environment and CLI configuration
//! - [`testing`]: Scripted mocks for tests

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod deck;
pub mod desktop;
pub mod driver;
pub mod error;
pub mod operator;
pub mod pacer;
pub mod playback;
pub mod runlog;
pub mod state;
pub mod store;
pub mod testing;

// Re-export commonly used types at crate root
pub use deck::{Deck, Method, Slide, Snippet};
pub use desktop::{CommandDesktop, Desktop, Focus};
pub use driver::{DriverSettings, Multiplexer, Prompt, TerminalDriver, TmuxMultiplexer, Wait};
pub use error::{ActionError, DeckError, SetupError, StateError};
pub use operator::{Command, Operator, StepView, Unattended};
pub use pacer::Pacer;
pub use playback::{Outcome, Playback, PlaybackOptions, PlaybackSummary};
pub use runlog::{RunLog, RunRecord};
pub use state::{PlaybackState, Toggle};
pub use store::StateStore;

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, AutopilotConfig, AutopilotToml,
    ConfigError, ConfigOverrides, ConfigSource,
};
