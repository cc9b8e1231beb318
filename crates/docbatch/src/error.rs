//! Error types for batch document processing

use std::path::Path;

use thiserror::Error;

use crate::remote::api::{ApiError, ReduceErrorInfo};
use crate::remote::messages;

/// Result type alias for docbatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// docbatch errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input (source list, destination folder, worker count)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP transport error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status returned by the server
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Structured error embedded in a successful response
    #[error("({action}) {}", messages::result_code_message(.error.result_code))]
    Remote {
        action: &'static str,
        error: ApiError,
    },

    /// Reduce-specific error carrying page context
    #[error("(Reduce) {}", messages::reduce_error_message(.0))]
    Reduce(ReduceErrorInfo),

    /// Response was missing its payload
    #[error("({action}) invalid response from server")]
    InvalidResponse { action: &'static str },

    /// Input file has zero length
    #[error("file is empty")]
    EmptyFile,

    /// Input file exceeds the server content limit
    #[error("file size {size} exceeds the maximum allowed size of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    /// `start` was called while workers from a previous run are alive
    #[error("a batch is already running")]
    AlreadyRunning,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Build the single human-readable message reported for `file`.
    pub fn describe(&self, file: &Path) -> String {
        let file = file.display();
        match self {
            Error::Remote { action, error } => {
                let mut message = format!(
                    "({}) {}: {}",
                    action,
                    messages::result_code_message(error.result_code),
                    file
                );
                if let Some(ext) = &error.ext_result_message {
                    message.push_str(&format!(" - {}", ext));
                }
                if let Some(status) = &error.ext_result_status {
                    message.push_str(&format!(" | status: {}", status));
                }
                if let Some(id) = &error.internal_error_id {
                    message.push_str(&format!(" | internal error id {}", id));
                }
                message
            }
            Error::Reduce(info) => {
                format!("(Reduce) {}: {}", messages::reduce_error_message(info), file)
            }
            Error::InvalidResponse { action } => {
                format!("({}) invalid response from server: {}", action, file)
            }
            Error::HttpStatus { status, message } => {
                format!("server returned HTTP error {}: {} - {}", status, file, message)
            }
            Error::Http(err) => match err.status() {
                Some(status) => format!(
                    "server returned HTTP error {}: {} - {}",
                    status.as_u16(),
                    file,
                    err
                ),
                None => format!("could not reach the remote server: {} - {}", file, err),
            },
            Error::EmptyFile | Error::FileTooLarge { .. } => format!("{}: {}", self, file),
            other => format!("unexpected error: {} - {}", file, other),
        }
    }
}
