//! Harness configuration.
//!
//! Everything here is optional: with no config file the harness looks for
//! `smash` one directory above its own executable and uses the defaults below.
//! A config file (YAML or TOML) overrides any subset of the fields.

use crate::case::{DEFAULT_PROMPT, DEFAULT_SHUTDOWN, DEFAULT_SHUTDOWN_KILL, DEFAULT_TIMEOUT};
use crate::report::DEFAULT_TRUNCATE;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the target binary when no path is configured.
pub const DEFAULT_TARGET_NAME: &str = "smash";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HarnessConfig {
    /// Path to the target executable. Relative paths resolve against the
    /// config file's directory.
    #[serde(default)]
    pub target: Option<PathBuf>,

    /// Arguments passed to the target on every spawn.
    #[serde(default)]
    pub args: Vec<String>,

    /// Prompt marker the target prints before reading a command.
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Directive that ends a session.
    #[serde(default = "default_shutdown")]
    pub shutdown: String,

    /// Directive that ends a session and kills the target's background jobs.
    #[serde(default = "default_shutdown_kill")]
    pub shutdown_kill: String,

    /// Default deadline in seconds for interactive cases. Cases that start
    /// many background jobs use their own, longer deadlines.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum number of characters of captured output shown per failure.
    #[serde(default = "default_truncate")]
    pub truncate: usize,
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_shutdown() -> String {
    DEFAULT_SHUTDOWN.to_string()
}

fn default_shutdown_kill() -> String {
    DEFAULT_SHUTDOWN_KILL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_truncate() -> usize {
    DEFAULT_TRUNCATE
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            target: None,
            args: Vec::new(),
            prompt: default_prompt(),
            shutdown: default_shutdown(),
            shutdown_kill: default_shutdown_kill(),
            timeout: default_timeout(),
            truncate: default_truncate(),
        }
    }
}

/// Generate the JSON schema for the config file.
pub fn generate_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(HarnessConfig)
}
