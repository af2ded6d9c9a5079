//! Network transport seam
//!
//! The scheduler never talks HTTP directly; it hands a [`FetchRequest`] to a
//! [`Transport`] and receives the status and body back. [`HttpTransport`] is the
//! production implementation on `reqwest`; tests substitute scripted transports.

mod http;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod scripted;

pub use http::HttpTransport;

use async_trait::async_trait;

use crate::config::{LoadOptions, RequestHeader};
use crate::progress::ProgressSink;
use crate::types::{Payload, PayloadKind, Resource};

/// One GET request, fully resolved from a resource and the batch options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Locator to fetch
    pub url: String,
    /// Headers in send order: batch headers first, then the resource's own
    pub headers: Vec<RequestHeader>,
    /// Whether credentials embedded in the locator may be sent
    pub with_credentials: bool,
    /// Representation the batch decoder expects
    pub kind: PayloadKind,
}

impl FetchRequest {
    /// Build the request for `resource` under `options`.
    pub fn for_resource(
        resource: &Resource,
        options: &LoadOptions,
        kind: PayloadKind,
    ) -> Self {
        let headers = options
            .request_headers
            .iter()
            .chain(&resource.headers)
            .cloned()
            .collect();
        Self {
            url: resource.locator.clone(),
            headers,
            with_credentials: resource.with_credentials.unwrap_or(options.with_credentials),
            kind,
        }
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Response status (0 when the transport has no status to report)
    pub status: u16,
    /// Reason phrase for the status (may be empty)
    pub status_text: String,
    /// Response body
    ///
    /// Transports may answer text requests with already decoded text or with the raw
    /// bytes; raw bytes are decoded with [`charset`](Self::charset) in the decode phase.
    pub payload: Payload,
    /// Character set the response declared for its body, if any
    pub charset: Option<String>,
}

impl FetchResponse {
    /// Whether the status counts as a successful fetch
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }
}

/// A response is successful when its status is 200, or 0 meaning "no status
/// available" (local or non-HTTP transports).
pub fn is_success_status(status: u16) -> bool {
    status == 200 || status == 0
}

/// Abstraction over fetching one resource, enabling testability.
///
/// Implementations report body progress through `progress` and return the final
/// status with the body. Cancellation is handled by the caller dropping the
/// returned future.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request.
    ///
    /// # Errors
    ///
    /// Network-level failures only; non-success statuses are returned as a
    /// [`FetchResponse`] so the caller can report them.
    async fn fetch(&self, request: FetchRequest, progress: ProgressSink) -> crate::Result<FetchResponse>;
}
