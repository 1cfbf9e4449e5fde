//! TOML Configuration File Support
//!
//! Configuration for the harness, loaded from
//! `~/.config/autopilot/autopilot.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [terminal]
//! program = "tmux"
//! target = "0"
//! timeout_secs = 60
//! long_wait_factor = 10
//! poll_interval_ms = 1000
//! settle_ms = 500
//! typing_max_delay_ms = 150
//! newline_pause_ms = 1000
//! shell_prompt = "$"
//! container_prompts = ["/ #"]
//!
//! [files]
//! state = "state.toml"
//! run_log = "autopilot.log"
//!
//! [desktop]
//! focus_slides = [["i3-msg", "workspace", "3"], ["i3-msg", "workspace", "1"]]
//! sync_slides = ["./gotoslide.js"]
//! open_url = ["xdg-open"]
//!
//! [playback]
//! pause_on_error = true
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::desktop::{CommandDesktop, CommandLine};
use crate::driver::DriverSettings;

// =============================================================================
// Error Types
// =============================================================================

/// Why a configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not an autopilot TOML document
    #[error("{} is not a valid autopilot config: {source}", .path.display())]
    Parse {
        /// Config file path
        path: PathBuf,
        /// TOML error with line and column
        source: toml::de::Error,
    },

    /// A setting is out of range
    #[error("Invalid setting {key}: {reason}")]
    Invalid {
        /// Dotted TOML key, e.g. `terminal.timeout_secs`
        key: &'static str,
        /// What the value must satisfy
        reason: &'static str,
    },
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Highest-priority layer that changed the configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    /// Command-line flags
    Cli,
    /// `AUTOPILOT_*` variables
    Env,
    /// The TOML file
    File,
    /// Built-in defaults only
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Cli => "command line",
            Self::Env => "environment",
            Self::File => "config file",
            Self::Default => "built-in defaults",
        })
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Terminal section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalToml {
    /// Multiplexer client binary
    pub program: Option<String>,

    /// tmux target (session, window or pane)
    pub target: Option<String>,

    /// Prompt and string wait deadline in seconds
    pub timeout_secs: Option<u64>,

    /// Multiplier for `longwait`
    pub long_wait_factor: Option<u32>,

    /// Screen polling interval in milliseconds
    pub poll_interval_ms: Option<u64>,

    /// Pause after sending a command in milliseconds
    pub settle_ms: Option<u64>,

    /// Maximum simulated keystroke delay in milliseconds
    pub typing_max_delay_ms: Option<u64>,

    /// Pause around simulated newlines in milliseconds
    pub newline_pause_ms: Option<u64>,

    /// Last line of an idle shell
    pub shell_prompt: Option<String>,

    /// Last lines of idle container shells
    pub container_prompts: Option<Vec<String>>,
}

/// Files section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesToml {
    /// Playback state document
    pub state: Option<PathBuf>,

    /// Append-only run log
    pub run_log: Option<PathBuf>,
}

/// Desktop section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopToml {
    /// Commands focusing the slides workspace
    pub focus_slides: Option<Vec<CommandLine>>,

    /// Commands focusing the terminal workspace
    pub focus_terminal: Option<Vec<CommandLine>>,

    /// Commands focusing the browser workspace
    pub focus_browser: Option<Vec<CommandLine>>,

    /// Slide sync command (slide number appended)
    pub sync_slides: Option<CommandLine>,

    /// URL opener (URL appended)
    pub open_url: Option<CommandLine>,
}

/// Playback section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackToml {
    /// Hand control back to the operator on failure
    pub pause_on_error: Option<bool>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotToml {
    /// Terminal configuration section
    pub terminal: TerminalToml,

    /// Files configuration section
    pub files: FilesToml,

    /// Desktop configuration section
    pub desktop: DesktopToml,

    /// Playback configuration section
    pub playback: PlaybackToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration for a playback session
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct AutopilotConfig {
    /// Multiplexer client binary
    pub program: String,

    /// tmux target; `None` lets tmux pick
    pub target: Option<String>,

    /// Driver timing and prompts
    pub driver: DriverSettings,

    /// Playback state document
    pub state_file: PathBuf,

    /// Append-only run log
    pub run_log: PathBuf,

    /// Desktop hook commands
    pub desktop: CommandDesktop,

    /// Hand control back to the operator on failure
    pub pause_on_error: bool,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

fn i3_workspaces(first: &str) -> Vec<CommandLine> {
    [first, "1"]
        .iter()
        .map(|ws| vec!["i3-msg".to_string(), "workspace".to_string(), (*ws).to_string()])
        .collect()
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            program: "tmux".to_string(),
            target: None,
            driver: DriverSettings::default(),
            state_file: PathBuf::from("state.toml"),
            run_log: PathBuf::from("autopilot.log"),
            desktop: CommandDesktop {
                focus_slides: i3_workspaces("3"),
                focus_terminal: i3_workspaces("2"),
                focus_browser: i3_workspaces("4"),
                sync_slides: vec!["./gotoslide.js".to_string()],
                open_url: vec!["xdg-open".to_string()],
            },
            pause_on_error: true,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl AutopilotConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Reject values the driver cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let driver = &self.driver;
        let checks = [
            (driver.timeout.is_zero(), "terminal.timeout_secs"),
            (driver.poll_interval.is_zero(), "terminal.poll_interval_ms"),
            (driver.long_wait_factor == 0, "terminal.long_wait_factor"),
        ];
        if let Some((_, key)) = checks.iter().find(|(zero, _)| *zero) {
            return Err(ConfigError::Invalid {
                key,
                reason: "must be greater than zero",
            });
        }
        if driver.shell_prompt.is_empty() {
            return Err(ConfigError::Invalid {
                key: "terminal.shell_prompt",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/autopilot/autopilot.toml` or
/// `~/.config/autopilot/autopilot.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("autopilot").join("autopilot.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<AutopilotConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or the result does not validate.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<AutopilotConfig, ConfigError> {
    let mut config = AutopilotConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                    path: config_path.clone(),
                    source,
                })?;

            let toml_config: AutopilotToml =
                toml::from_str(&toml_content).map_err(|source| ConfigError::Parse {
                    path: config_path.clone(),
                    source,
                })?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());

    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut AutopilotConfig, toml: &AutopilotToml) {
    let terminal = &toml.terminal;
    if let Some(ref program) = terminal.program {
        config.program.clone_from(program);
    }
    if terminal.target.is_some() {
        config.target.clone_from(&terminal.target);
    }
    if let Some(secs) = terminal.timeout_secs {
        config.driver.timeout = Duration::from_secs(secs);
    }
    if let Some(factor) = terminal.long_wait_factor {
        config.driver.long_wait_factor = factor;
    }
    if let Some(ms) = terminal.poll_interval_ms {
        config.driver.poll_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = terminal.settle_ms {
        config.driver.settle = Duration::from_millis(ms);
    }
    if let Some(ms) = terminal.typing_max_delay_ms {
        config.driver.typing_max_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = terminal.newline_pause_ms {
        config.driver.newline_pause = Duration::from_millis(ms);
    }
    if let Some(ref prompt) = terminal.shell_prompt {
        config.driver.shell_prompt.clone_from(prompt);
    }
    if let Some(ref prompts) = terminal.container_prompts {
        config.driver.container_prompts.clone_from(prompts);
    }

    if let Some(ref path) = toml.files.state {
        config.state_file.clone_from(path);
    }
    if let Some(ref path) = toml.files.run_log {
        config.run_log.clone_from(path);
    }

    let desktop = &toml.desktop;
    if let Some(ref commands) = desktop.focus_slides {
        config.desktop.focus_slides.clone_from(commands);
    }
    if let Some(ref commands) = desktop.focus_terminal {
        config.desktop.focus_terminal.clone_from(commands);
    }
    if let Some(ref commands) = desktop.focus_browser {
        config.desktop.focus_browser.clone_from(commands);
    }
    if let Some(ref command) = desktop.sync_slides {
        config.desktop.sync_slides.clone_from(command);
    }
    if let Some(ref command) = desktop.open_url {
        config.desktop.open_url.clone_from(command);
    }

    if let Some(pause) = toml.playback.pause_on_error {
        config.pause_on_error = pause;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut AutopilotConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(target) = var("AUTOPILOT_TMUX_TARGET") {
        config.target = Some(target);
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = var("AUTOPILOT_TIMEOUT_SECS") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.driver.timeout = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(path) = var("AUTOPILOT_STATE_FILE") {
        config.state_file = PathBuf::from(path);
        config.source = ConfigSource::Env;
    }
    if let Some(path) = var("AUTOPILOT_RUN_LOG") {
        config.run_log = PathBuf::from(path);
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// tmux target override
    pub target: Option<String>,

    /// State file override
    pub state_file: Option<PathBuf>,

    /// Run log override
    pub run_log: Option<PathBuf>,

    /// Pause-on-error override
    pub pause_on_error: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set tmux target override
    #[must_use]
    pub fn with_target(mut self, target: String) -> Self {
        self.target = Some(target);
        self
    }

    /// Set state file override
    #[must_use]
    pub fn with_state_file(mut self, path: PathBuf) -> Self {
        self.state_file = Some(path);
        self
    }

    /// Set run log override
    #[must_use]
    pub fn with_run_log(mut self, path: PathBuf) -> Self {
        self.run_log = Some(path);
        self
    }

    /// Set pause-on-error override
    #[must_use]
    pub fn with_pause_on_error(mut self, pause: bool) -> Self {
        self.pause_on_error = Some(pause);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut AutopilotConfig) {
        if self.target.is_some()
            || self.state_file.is_some()
            || self.run_log.is_some()
            || self.pause_on_error.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref target) = self.target {
            config.target = Some(target.clone());
        }
        if let Some(ref path) = self.state_file {
            config.state_file.clone_from(path);
        }
        if let Some(ref path) = self.run_log {
            config.run_log.clone_from(path);
        }
        if let Some(pause) = self.pause_on_error {
            config.pause_on_error = pause;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
