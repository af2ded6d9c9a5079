//! Indirection (manifest) expansion
//!
//! A batch consisting of exactly one manifest resource is not decoded itself: the
//! manifest is fetched as binary, parsed by the [`ManifestParser`] that recognised
//! it, and its first file group becomes the batch, each entry qualified against the
//! manifest's own directory.

mod json;

pub use json::JsonManifestParser;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::LoadOptions;
use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use crate::transport::{FetchRequest, Transport};
use crate::types::{PayloadKind, Phase, Resource};
use crate::utils::qualify;

/// Recognises and parses one manifest format
pub trait ManifestParser: Send + Sync {
    /// Name for logging
    fn name(&self) -> &'static str;

    /// Whether `resource` is a manifest of this format (by name convention)
    fn is_manifest(&self, resource: &Resource) -> bool;

    /// Parse a fetched manifest into its file groups, in document order
    ///
    /// # Errors
    ///
    /// Returns [`Error::Manifest`] when the document is malformed.
    fn parse(&self, resource: &Resource, bytes: &[u8]) -> Result<Vec<Vec<String>>>;
}

/// Detects manifest batches and expands them into the resources they list
#[derive(Clone, Default)]
pub struct IndirectionExpander {
    parsers: Vec<Arc<dyn ManifestParser>>,
}

impl IndirectionExpander {
    /// Expander with no parsers (never detects a manifest)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parser; parsers are consulted in registration order.
    pub fn register(&mut self, parser: Arc<dyn ManifestParser>) {
        tracing::debug!(parser = parser.name(), "Registered manifest parser");
        self.parsers.push(parser);
    }

    /// Number of registered parsers
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// True when no parser is registered
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// The parser for `resources` if the batch is a single manifest resource.
    pub fn find(&self, resources: &[Resource]) -> Option<Arc<dyn ManifestParser>> {
        let [resource] = resources else {
            return None;
        };
        self.parsers
            .iter()
            .find(|p| p.is_manifest(resource))
            .cloned()
    }

    /// Whether `resources` is a single manifest resource
    pub fn is_indirection(&self, resources: &[Resource]) -> bool {
        self.find(resources).is_some()
    }

    /// Fetch and parse `manifest`, returning the qualified resources of its first group.
    ///
    /// Expanded resources inherit the manifest's own headers and credentials
    /// override; batch-level options apply to them as they did to the manifest.
    ///
    /// # Errors
    ///
    /// [`Error::Aborted`] when `cancel_token` fires first, otherwise
    /// [`Error::Manifest`] for any fetch or parse failure.
    pub async fn expand(
        &self,
        transport: &dyn Transport,
        parser: &dyn ManifestParser,
        manifest: &Resource,
        options: &LoadOptions,
        cancel_token: &CancellationToken,
    ) -> Result<Vec<Resource>> {
        let locator = manifest.locator.as_str();
        let request = FetchRequest::for_resource(manifest, options, PayloadKind::Binary);

        let response = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Err(Error::Aborted),
            result = transport.fetch(request, ProgressSink::detached(Phase::Manifest)) => result,
        };
        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_abort() => return Err(e),
            Err(e) => return Err(Error::manifest(locator, format!("fetch failed: {e}"))),
        };
        if !response.is_success() {
            return Err(Error::manifest(
                locator,
                format!("HTTP {} {}", response.status, response.status_text),
            ));
        }

        let groups = parser.parse(manifest, response.payload.as_bytes())?;
        let Some(first) = groups.into_iter().next() else {
            return Err(Error::manifest(locator, "manifest lists no file groups"));
        };
        if first.is_empty() {
            return Err(Error::manifest(locator, "first file group is empty"));
        }

        let expanded = first
            .iter()
            .map(|entry| {
                Ok(Resource {
                    locator: qualify(locator, entry)?,
                    headers: manifest.headers.clone(),
                    with_credentials: manifest.with_credentials,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            manifest = %locator,
            parser = parser.name(),
            count = expanded.len(),
            "Expanded manifest"
        );
        Ok(expanded)
    }
}
