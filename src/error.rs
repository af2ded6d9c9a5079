//! Error types for batch-loader
//!
//! Errors fall into two groups:
//! - Fatal errors returned synchronously from [`FetchScheduler::load`](crate::FetchScheduler::load)
//!   (empty batch, no decoder, heterogeneous batch, invalid options)
//! - Per-item errors delivered through the `on_error` hook (transport, decode, manifest)
//!
//! Cancellation is modelled as [`Error::Aborted`] so that transports and decoders can
//! report it through the same `Result`, but the scheduler never surfaces it as an error
//! event: aborted items fire `on_abort` instead.

use thiserror::Error;

/// Result type alias for batch-loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for batch-loader
#[derive(Debug, Error)]
pub enum Error {
    /// `load` was called with no resources
    #[error("cannot load an empty batch")]
    EmptyBatch,

    /// No registered decoder accepts the batch's first resource
    #[error("no decoder found for {resource}")]
    NoDecoder {
        /// Locator of the representative (first) resource
        resource: String,
    },

    /// A later resource is rejected by the decoder selected for the batch
    #[error("resource {index} ({resource}) cannot be decoded by {decoder}; batches must be homogeneous")]
    HeterogeneousBatch {
        /// Position of the rejected resource in the batch
        index: usize,
        /// Locator of the rejected resource
        resource: String,
        /// Name of the decoder selected from the first resource
        decoder: &'static str,
    },

    /// The transport answered with a status that is not considered a success
    #[error("HTTP {status} {status_text} fetching {resource}")]
    Transport {
        /// Locator that was fetched
        resource: String,
        /// Response status code
        status: u16,
        /// Canonical reason phrase for the status (may be empty)
        status_text: String,
    },

    /// The locator cannot be turned into a request URL
    #[error("invalid locator {resource}: {message}")]
    InvalidLocator {
        /// The offending locator
        resource: String,
        /// Parse failure description
        message: String,
    },

    /// Network-level failure (connection refused, DNS, body read, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The decoder failed to turn a payload into domain data
    #[error("failed to decode {resource}: {message}")]
    Decode {
        /// Locator of the payload's resource
        resource: String,
        /// Decoder-provided description
        message: String,
    },

    /// Fetching or parsing an indirection manifest failed
    #[error("manifest {resource}: {message}")]
    Manifest {
        /// Locator of the manifest resource
        resource: String,
        /// Description of the failure
        message: String,
    },

    /// A text payload used a character set this crate cannot decode
    #[error("unsupported character set: {0}")]
    UnsupportedCharset(String),

    /// Invalid configuration or load options
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The option that caused the error (e.g., "batch_size")
        key: Option<String>,
    },

    /// The operation was cancelled by an abort request
    #[error("operation aborted")]
    Aborted,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Decode`] for the given resource locator.
    pub fn decode(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Decode {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Build a [`Error::Manifest`] for the given resource locator.
    pub fn manifest(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Manifest {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Build a [`Error::Config`] naming the offending key.
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// True when this error represents cancellation rather than failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    /// HTTP status carried by the error, if the transport produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for errors `load` returns synchronously instead of reporting per item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::EmptyBatch
                | Error::NoDecoder { .. }
                | Error::HeterogeneousBatch { .. }
                | Error::Config { .. }
        )
    }
}
