//! Error types for stream processing.
//!
//! Every terminal failure that travels down a pipeline is a [`StreamError`].
//! Recoverable protocol anomalies (chunk sequence mismatches) never become
//! errors; they are logged and counted by the reassembly operator instead.
//!
//! ## Error Categories
//!
//! - **Transform Errors**: failures reported by external codec, container or
//!   capture collaborators
//! - **Decode Errors**: fragment payloads that are not valid base64
//! - **Parse Errors**: malformed JSON fragments or YAML configuration
//! - **File Errors**: replay files that cannot be opened or read
//! - **Channel Errors**: publish/subscribe failures of the channel client
//! - **Worker Errors**: worker boundary threads that could not start or died
//! - **Config Errors**: configuration rejected by validation
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use framewire::StreamError;
//!
//! let error = StreamError::channel_failed("subscription dropped");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stream operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for stream operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Transform '{stage}' failed")]
    Transform {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid base64 payload in {context}")]
    Decode {
        context: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Channel operation failed: {reason}")]
    Channel {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Worker '{name}' failed: {reason}")]
    Worker {
        name: String,
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Metrics registration failed")]
    Metrics {
        #[source]
        source: prometheus::Error,
    },
}

impl StreamError {
    /// Returns whether this error is potentially recoverable by restarting the pipeline.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Channel { .. } => true,
            StreamError::Worker { .. } => true,
            StreamError::Transform { .. } => false,
            StreamError::Decode { .. } => false,
            StreamError::Parse { .. } => false,
            StreamError::File { .. } => false,
            StreamError::Config { .. } => false,
            StreamError::Metrics { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::Transform { .. } => vec![
                "Check the input codec is supported by the media backend",
                "Verify the source file or device is not corrupted",
            ],
            StreamError::Decode { .. } => vec![
                "Verify the publisher base64-encodes fragment payloads",
                "Check the channel carries video fragments only",
            ],
            StreamError::Parse { .. } => vec![
                "Check data format compatibility",
                "Verify source data integrity",
            ],
            StreamError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            StreamError::Channel { .. } => vec![
                "Check endpoint and appkey",
                "Verify network connectivity",
                "Restart the pipeline",
            ],
            StreamError::Worker { .. } => vec![
                "Check system thread limits",
                "Restart the pipeline",
            ],
            StreamError::Config { .. } => vec![
                "Select exactly one input",
                "Check resolution format is <width>x<height> or original",
            ],
            StreamError::Metrics { .. } => vec![
                "Avoid registering the same pipeline metrics twice",
                "Use a fresh prometheus Registry per pipeline",
            ],
        }
    }

    /// Helper constructor for external collaborator failures.
    pub fn transform(stage: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        StreamError::Transform { stage: stage.into(), source: source.into() }
    }

    /// Helper constructor for base64 payload errors.
    pub fn decode(context: impl Into<String>, source: base64::DecodeError) -> Self {
        StreamError::Decode { context: context.into(), source }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl std::fmt::Display) -> Self {
        StreamError::Parse { context: context.into(), details: details.to_string() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamError::File { path, source }
    }

    /// Helper constructor for channel errors.
    pub fn channel_failed(reason: impl Into<String>) -> Self {
        StreamError::Channel { reason: reason.into(), source: None }
    }

    /// Helper constructor for worker thread failures.
    pub fn worker_failed(
        name: impl Into<String>,
        reason: impl Into<String>,
        source: Option<std::io::Error>,
    ) -> Self {
        StreamError::Worker { name: name.into(), reason: reason.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        StreamError::Config { reason: reason.into() }
    }
}

impl From<prometheus::Error> for StreamError {
    fn from(source: prometheus::Error) -> Self {
        StreamError::Metrics { source }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::parse("json", err)
    }
}
