//! HTTP transport on `reqwest`

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::{FetchRequest, FetchResponse, Transport};
use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use crate::types::Payload;
use crate::utils::charset_from_content_type;

/// Cap on the body buffer pre-allocated from `Content-Length`
const MAX_PREALLOCATED_BODY: u64 = 16 * 1024 * 1024;

/// Production [`Transport`] issuing GET requests through a shared `reqwest::Client`
///
/// Streams the body chunk by chunk so progress is reported as bytes arrive.
/// Bodies are always returned as raw bytes together with the `Content-Type` charset.
/// Dropping the future returned by [`fetch`](Transport::fetch) cancels the request.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from configuration
    ///
    /// # Errors
    ///
    /// Fails when the underlying HTTP client cannot be constructed (e.g. TLS backend
    /// initialisation).
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shares its connection pool)
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Parse the request URL, dropping embedded credentials unless they may be sent.
///
/// reqwest turns URL user-info into a basic `Authorization` header, so keeping it is
/// how credentials get sent.
fn request_url(request: &FetchRequest) -> Result<url::Url> {
    let mut url = url::Url::parse(&request.url).map_err(|e| Error::InvalidLocator {
        resource: request.url.clone(),
        message: e.to_string(),
    })?;
    if !request.with_credentials && (!url.username().is_empty() || url.password().is_some()) {
        // Only fails for cannot-be-a-base URLs, which carry no user-info anyway.
        let _ = url.set_username("");
        let _ = url.set_password(None);
    }
    Ok(url)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: FetchRequest, progress: ProgressSink) -> Result<FetchResponse> {
        let url = request_url(&request)?;

        let mut builder = self.client.get(url);
        for header in &request.headers {
            builder = builder.header(header.name.as_str(), header.value.as_str());
        }

        let mut response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::warn!(url = %request.url, "Request timed out");
            } else if e.is_connect() {
                tracing::warn!(url = %request.url, error = %e, "Connection failed");
            }
            Error::Network(e)
        })?;

        let status = response.status();
        let total = response.content_length();
        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        let capacity = total.unwrap_or(0).min(MAX_PREALLOCATED_BODY) as usize;
        let mut body = Vec::with_capacity(capacity);
        progress.report(0, total);
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            progress.report(body.len() as u64, total);
        }

        let status_code = status.as_u16();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        tracing::debug!(
            url = %request.url,
            status = status_code,
            bytes = body.len(),
            "Fetch finished"
        );

        Ok(FetchResponse {
            status: status_code,
            status_text,
            payload: Payload::Binary(body),
            charset,
        })
    }
}
