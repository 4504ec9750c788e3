/// Structured error types for acrocmd-core.
///
/// The library reports failures through `CommanderError`; the binary crate
/// (acrocmd-cli) wraps them in `anyhow` where it only needs to display them.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for acrocmd-core operations
#[derive(Error, Debug)]
pub enum CommanderError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// JSON parsing or serialization failed
    #[error("JSON error in {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// Required config field missing or empty
    #[error("Missing \"{field}\" in config file.")]
    MissingConfigField { field: String },

    /// Config file could not be read
    #[error("Config not found at {path:?}")]
    ConfigNotFound { path: PathBuf },

    /// HTTP transport failed
    #[error("Request to {context} failed: {source}")]
    Http {
        context: String,
        source: reqwest::Error,
    },

    /// Checking service answered with a non-success status
    #[error("Checking service returned {status} for {context}: {body}")]
    Api {
        status: u16,
        context: String,
        body: String,
    },

    /// Reference pattern from the server is not a valid regex
    #[error("Invalid reference pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    /// A submitted check never finished
    #[error("Check of {reference} did not finish within {}s", .waited.as_secs())]
    CheckTimedOut { reference: String, waited: Duration },

    /// File or directory not found
    #[error("Path not found: {path:?}")]
    PathNotFound { path: PathBuf },
}

/// Result type alias for acrocmd-core operations
pub type Result<T> = std::result::Result<T, CommanderError>;

impl CommanderError {
    /// Create a JSON error with context
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Create a missing config field error
    pub fn missing_config_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an HTTP transport error
    pub fn http(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            context: context.into(),
            source,
        }
    }

    /// Create an API status error, truncating long bodies
    pub fn api(status: u16, context: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let body = if body.len() > 500 {
            let mut cut = 500;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &body[..cut])
        } else {
            body
        };
        Self::Api {
            status,
            context: context.into(),
            body,
        }
    }

    /// Create a path not found error
    pub fn check_timed_out(reference: impl Into<String>, waited: Duration) -> Self {
        Self::CheckTimedOut {
            reference: reference.into(),
            waited,
        }
    }

    pub fn path_not_found(path: impl Into<PathBuf>) -> Self {
        Self::PathNotFound { path: path.into() }
    }
}
