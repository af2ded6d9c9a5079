//! Core types for batch-loader

use serde::{Deserialize, Serialize};

use crate::config::RequestHeader;
use crate::error::Error;

/// A remote resource to fetch: a locator plus optional per-request metadata
///
/// Within a batch a resource is identified by its index; the index is the
/// correlation key carried by every progress, item, error and abort event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// URI of the resource
    pub locator: String,
    /// Extra headers for this resource only (sent after the batch headers)
    #[serde(default)]
    pub headers: Vec<RequestHeader>,
    /// Per-resource override of [`LoadOptions::with_credentials`](crate::LoadOptions)
    #[serde(default)]
    pub with_credentials: Option<bool>,
}

impl Resource {
    /// Create a resource with no per-request metadata
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            headers: Vec::new(),
            with_credentials: None,
        }
    }

    /// Add a header sent only when fetching this resource
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(RequestHeader::new(name, value));
        self
    }

    /// Override the batch-level credentials flag for this resource
    #[must_use]
    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = Some(with_credentials);
        self
    }

    /// Last path segment of the locator, percent-decoded (query and fragment ignored)
    pub fn file_name(&self) -> Option<String> {
        crate::utils::file_name(&self.locator)
    }

    /// Lower-cased extension of [`file_name`](Self::file_name), without the dot
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl From<&str> for Resource {
    fn from(locator: &str) -> Self {
        Self::new(locator)
    }
}

impl From<String> for Resource {
    fn from(locator: String) -> Self {
        Self::new(locator)
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.locator)
    }
}

/// Payload representation a decoder asks the transport for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// Raw bytes
    Binary,
    /// Text decoded with the response (or default) character set
    Text,
}

/// A fetched response body
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Raw bytes
    Binary(Vec<u8>),
    /// Decoded text
    Text(String),
}

impl Payload {
    /// Which representation this payload uses
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Binary(_) => PayloadKind::Binary,
            Payload::Text(_) => PayloadKind::Text,
        }
    }

    /// Size of the payload in bytes
    pub fn len(&self) -> usize {
        match self {
            Payload::Binary(b) => b.len(),
            Payload::Text(s) => s.len(),
        }
    }

    /// True when the payload carries no data
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the payload as bytes regardless of representation
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Binary(b) => b,
            Payload::Text(s) => s.as_bytes(),
        }
    }
}

/// Stage of an item's lifecycle an event refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Network fetch of the resource
    Fetch,
    /// Decoding of the fetched payload
    Decode,
    /// Fetch or parse of an indirection manifest
    Manifest,
}

/// Fired once when a batch starts (and again when a manifest's expansion starts)
#[derive(Clone, Debug)]
pub struct LoadStartEvent {
    /// The batch being loaded
    pub source: Vec<Resource>,
}

/// Progress of one item, with the aggregated progress of the whole batch
#[derive(Clone, Debug)]
pub struct ProgressEvent {
    /// Resource the update came from
    pub source: Resource,
    /// Index of the resource in the batch
    pub index: usize,
    /// Phase that progressed
    pub phase: Phase,
    /// Fraction of this item's phase completed, in [0, 1]
    pub item_fraction: f64,
    /// Aggregated batch progress, in [0, `total`]
    pub loaded: f64,
    /// Scale of `loaded` (always 100)
    pub total: f64,
}

/// Fired for each successfully decoded item
#[derive(Clone, Debug)]
pub struct LoadItemEvent<T> {
    /// Resource the data was decoded from
    pub source: Resource,
    /// Index of the resource in the batch
    pub index: usize,
    /// Decoded data
    pub data: T,
}

/// Fired once when every item of the batch decoded successfully
#[derive(Clone, Debug)]
pub struct LoadEvent {
    /// The batch that loaded
    pub source: Vec<Resource>,
}

/// Fired once when every item reached both a fetch and a decode conclusion
#[derive(Clone, Debug)]
pub struct LoadEndEvent {
    /// The batch that ended
    pub source: Vec<Resource>,
    /// Outcome counts at the time the batch ended
    pub summary: LoadSummary,
}

/// A per-item failure
#[derive(Debug)]
pub struct ErrorEvent {
    /// Resource that failed (the manifest itself for manifest failures)
    pub source: Resource,
    /// Index of the resource in the batch (None for manifest failures)
    pub index: Option<usize>,
    /// Phase that failed
    pub phase: Phase,
    /// What went wrong
    pub error: Error,
}

/// A per-item cancellation
#[derive(Clone, Debug)]
pub struct AbortEvent {
    /// Resource whose operation was cancelled
    pub source: Resource,
    /// Index of the resource in the batch (None for the manifest)
    pub index: Option<usize>,
    /// Phase that was cancelled
    pub phase: Phase,
}

/// Outcome counts for one batch
#[must_use]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Number of resources in the batch
    pub total: usize,
    /// Items decoded successfully
    pub loaded: usize,
    /// Items that failed to fetch or decode
    pub errored: usize,
    /// Items cancelled mid-flight
    pub aborted: usize,
    /// Whether an abort was requested during the batch
    pub was_aborted: bool,
}

impl LoadSummary {
    /// True when every resource decoded successfully
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.loaded == self.total
    }

    /// Items that never reached a conclusion (not dispatched before an abort)
    pub fn skipped(&self) -> usize {
        self.total
            .saturating_sub(self.loaded + self.errored + self.aborted)
    }
}
