//! Configuration types for lg-coordinator
//!
//! Defines `Settings` (`.lgc/config.toml`) and its sections.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::AgentSpec;
use crate::state::DEFAULT_CTX_LIMIT;

/// Application settings (.lgc/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub tool: ToolSettings,

    #[serde(default)]
    pub git: GitSettings,

    #[serde(default)]
    pub defaults: DefaultSelections,

    /// CLI agents offered as providers
    #[serde(default)]
    pub agents: Vec<AgentSpec>,

    #[serde(default)]
    pub file_provider: FileProviderSettings,
}

/// The listing-generator executable
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolSettings {
    #[serde(default = "default_tool_command")]
    pub command: String,

    /// Per-invocation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            command: default_tool_command(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ToolSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_tool_command() -> String {
    lgc_tool::DEFAULT_PROGRAM.to_string()
}

fn default_timeout_secs() -> u64 {
    lgc_tool::DEFAULT_TIMEOUT.as_secs()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GitSettings {
    #[serde(default = "default_git_command")]
    pub command: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            command: default_git_command(),
        }
    }
}

fn default_git_command() -> String {
    "git".to_string()
}

/// Selections applied when no saved state exists
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DefaultSelections {
    #[serde(default = "default_ctx_limit")]
    pub ctx_limit: u64,

    #[serde(default)]
    pub tokenizer_lib: Option<String>,

    #[serde(default)]
    pub encoder: Option<String>,
}

impl Default for DefaultSelections {
    fn default() -> Self {
        Self {
            ctx_limit: default_ctx_limit(),
            tokenizer_lib: None,
            encoder: None,
        }
    }
}

fn default_ctx_limit() -> u64 {
    DEFAULT_CTX_LIMIT
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileProviderSettings {
    /// Destination, relative to the project root unless absolute
    #[serde(default = "default_listing_path")]
    pub path: PathBuf,
}

impl Default for FileProviderSettings {
    fn default() -> Self {
        Self {
            path: default_listing_path(),
        }
    }
}

fn default_listing_path() -> PathBuf {
    PathBuf::from(".lgc").join("last-listing.md")
}
