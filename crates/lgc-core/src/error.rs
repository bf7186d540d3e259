//! Application error types with rich context

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // External Tool Errors
    // ─────────────────────────────────────────────────────────────
    #[error("External tool not found: '{program}'. Ensure it is installed and in your PATH.")]
    ToolNotFound { program: String },

    #[error("'{program}' timed out after {timeout:?}")]
    ToolTimeout { program: String, timeout: Duration },

    #[error("'{program}' exited with code {code:?}: {stderr}")]
    ToolExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to run external tool: {message}")]
    Process { message: String },

    #[error("Tool output protocol error: {message}")]
    Protocol { message: String },

    // ─────────────────────────────────────────────────────────────
    // Registry Errors (startup configuration)
    // ─────────────────────────────────────────────────────────────
    #[error("Command kind '{kind}' is declared more than once")]
    DuplicateCommand { kind: &'static str },

    #[error("A rule for command kind '{kind}' is already registered")]
    DuplicateRule { kind: &'static str },

    // ─────────────────────────────────────────────────────────────
    // Runtime Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No async runtime available: {message}")]
    NoRuntime { message: String },

    #[error("Async operation '{label}' failed: {message}")]
    Operation { label: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Provider Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Unknown provider: {id}")]
    UnknownProvider { id: String },

    #[error("Provider '{id}' is not available")]
    ProviderUnavailable { id: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn tool_not_found(program: impl Into<String>) -> Self {
        Self::ToolNotFound {
            program: program.into(),
        }
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn no_runtime(message: impl Into<String>) -> Self {
        Self::NoRuntime {
            message: message.into(),
        }
    }

    pub fn operation(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            label: label.into(),
            message: message.into(),
        }
    }

    pub fn unknown_provider(id: impl Into<String>) -> Self {
        Self::UnknownProvider { id: id.into() }
    }

    pub fn provider_unavailable(id: impl Into<String>) -> Self {
        Self::ProviderUnavailable { id: id.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors degrade a single catalog or delivery; the
    /// coordinator keeps running with empty data.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ToolTimeout { .. }
                | Error::ToolExit { .. }
                | Error::Process { .. }
                | Error::Protocol { .. }
                | Error::Json(_)
                | Error::Operation { .. }
                | Error::ProviderUnavailable { .. }
        )
    }

    /// Check if this error should abort startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DuplicateCommand { .. }
                | Error::DuplicateRule { .. }
                | Error::NoRuntime { .. }
                | Error::ConfigInvalid { .. }
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::config_invalid(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
