//! Batched, cancellable fetch scheduler
//!
//! [`FetchScheduler::load`] runs one batch end to end:
//!
//! 1. *load-start* fires with the batch.
//! 2. A batch of exactly one manifest resource is fetched, expanded into the
//!    resources it lists, and the expanded batch starts again at step 1.
//! 3. The first registered decoder accepting the first resource serves the batch.
//! 4. Fetches are dispatched in index order through a sliding window of
//!    `batch_size` slots; each successful fetch is handed to the decoder.
//! 5. *load* fires once every item decoded successfully and *load-end* fires once
//!    every dispatched item has concluded.
//!
//! Per-batch state lives in the run loop and is dropped when `load` returns.
//! `load` takes `&mut self`, so a handler can never start a second batch on the
//! same scheduler while one is running.

mod batch;
mod run;
mod window;

use std::sync::Arc;

use crate::cancel::{AbortHandle, CancellationController};
use crate::config::{Config, LoadOptions};
use crate::decoder::{Decoder, DecoderRef, DecoderRegistry};
use crate::error::{Error, Result};
use crate::events::LifecycleEmitter;
use crate::manifest::{IndirectionExpander, JsonManifestParser, ManifestParser};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    AbortEvent, ErrorEvent, LoadEndEvent, LoadEvent, LoadItemEvent, LoadStartEvent, LoadSummary, Phase,
    ProgressEvent, Resource,
};

use run::BatchRun;

/// How many manifests may expand into another manifest before the batch fails
pub const MAX_MANIFEST_DEPTH: usize = 4;

/// Loads batches of resources through a pluggable decoder
///
/// `T` is the decoder output delivered with each item.
///
/// # Examples
///
/// ```no_run
/// use batch_loader::decoder::TextDecoder;
/// use batch_loader::{Config, FetchScheduler, LoadOptions, Resource};
///
/// # #[tokio::main]
/// # async fn main() -> batch_loader::Result<()> {
/// let mut scheduler: FetchScheduler<String> = FetchScheduler::new(Config::default())?;
/// scheduler.register_decoder(TextDecoder::new());
/// scheduler.on_load_item(|item| println!("{} -> {} chars", item.source, item.data.len()));
///
/// let summary = scheduler
///     .load(
///         vec![Resource::new("http://example.com/a.txt"), Resource::new("http://example.com/b.txt")],
///         LoadOptions { batch_size: Some(1), ..Default::default() },
///     )
///     .await?;
/// assert_eq!(summary.total, 2);
/// # Ok(())
/// # }
/// ```
pub struct FetchScheduler<T> {
    transport: Arc<dyn Transport>,
    decoders: DecoderRegistry<T>,
    expander: IndirectionExpander,
    events: LifecycleEmitter<T>,
    controller: CancellationController,
    default_charset: Option<String>,
    default_options: LoadOptions,
}

impl<T: Send + 'static> std::fmt::Debug for FetchScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchScheduler")
            .field("decoders", &self.decoders.names())
            .field("manifest_parsers", &self.expander.len())
            .field("default_charset", &self.default_charset)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> FetchScheduler<T> {
    /// Scheduler fetching over HTTP, detecting manifests named in `config.manifest`
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config.transport)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Scheduler using a custom transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let mut expander = IndirectionExpander::new();
        if !config.manifest.file_names.is_empty() {
            expander.register(Arc::new(JsonManifestParser::from_config(&config.manifest)));
        }
        Self {
            transport,
            decoders: DecoderRegistry::new(),
            expander,
            events: LifecycleEmitter::new(),
            controller: CancellationController::new(),
            default_charset: config.default_charset,
            default_options: config.load,
        }
    }

    /// Register a decoder; earlier registrations win selection.
    pub fn register_decoder<D>(&mut self, decoder: D) -> &mut Self
    where
        D: Decoder<Output = T> + 'static,
    {
        self.decoders.register(Arc::new(decoder));
        self
    }

    /// Register a decoder the caller keeps a handle to.
    pub fn register_shared_decoder(&mut self, decoder: DecoderRef<T>) -> &mut Self {
        self.decoders.register(decoder);
        self
    }

    /// Register an additional manifest format.
    pub fn register_manifest_parser(&mut self, parser: Arc<dyn ManifestParser>) -> &mut Self {
        self.expander.register(parser);
        self
    }

    /// Registered decoders
    pub fn decoders(&self) -> &DecoderRegistry<T> {
        &self.decoders
    }

    /// All lifecycle hooks
    pub fn events_mut(&mut self) -> &mut LifecycleEmitter<T> {
        &mut self.events
    }

    /// Set the handler fired when a batch starts
    pub fn on_load_start(&mut self, handler: impl FnMut(&LoadStartEvent) + Send + 'static) -> &mut Self {
        self.events.on_load_start(handler);
        self
    }

    /// Set the handler fired on fetch or decode progress
    pub fn on_progress(&mut self, handler: impl FnMut(&ProgressEvent) + Send + 'static) -> &mut Self {
        self.events.on_progress(handler);
        self
    }

    /// Set the handler fired for each decoded item
    pub fn on_load_item(&mut self, handler: impl FnMut(LoadItemEvent<T>) + Send + 'static) -> &mut Self {
        self.events.on_load_item(handler);
        self
    }

    /// Set the handler fired once every item decoded successfully
    pub fn on_load(&mut self, handler: impl FnMut(&LoadEvent) + Send + 'static) -> &mut Self {
        self.events.on_load(handler);
        self
    }

    /// Set the handler fired once when the batch ends
    pub fn on_load_end(&mut self, handler: impl FnMut(&LoadEndEvent) + Send + 'static) -> &mut Self {
        self.events.on_load_end(handler);
        self
    }

    /// Set the handler fired for each per-item failure
    pub fn on_error(&mut self, handler: impl FnMut(&ErrorEvent) + Send + 'static) -> &mut Self {
        self.events.on_error(handler);
        self
    }

    /// Set the handler fired for each cancelled operation
    pub fn on_abort(&mut self, handler: impl FnMut(&AbortEvent) + Send + 'static) -> &mut Self {
        self.events.on_abort(handler);
        self
    }

    /// Character set forced onto text payloads, if any
    pub fn default_character_set(&self) -> Option<&str> {
        self.default_charset.as_deref()
    }

    /// Force a character set onto text payloads (None = use the response's)
    pub fn set_default_character_set(&mut self, charset: Option<String>) {
        self.default_charset = charset;
    }

    /// Abort the running batch. Idempotent.
    pub fn abort(&self) {
        self.controller.abort();
    }

    /// Whether the current batch has been aborted
    pub fn is_aborting(&self) -> bool {
        self.controller.is_aborting()
    }

    /// Handle that aborts whichever batch is running when it is used
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle::new(self.controller.clone())
    }

    /// Load `resources` with the options from [`Config::load`].
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub async fn load_default(&mut self, resources: Vec<Resource>) -> Result<LoadSummary> {
        let options = self.default_options.clone();
        self.load(resources, options).await
    }

    /// Load one batch, returning once it has ended.
    ///
    /// Per-item failures and aborts are reported through the error and abort hooks
    /// and counted in the returned summary.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyBatch`] or [`Error::Config`] before any event fires
    /// - [`Error::NoDecoder`] after *load-start*, before any fetch
    /// - [`Error::HeterogeneousBatch`] when a dispatched resource is rejected by the
    ///   batch decoder; outstanding fetches are cancelled and no further events fire
    pub async fn load(&mut self, resources: Vec<Resource>, options: LoadOptions) -> Result<LoadSummary> {
        if resources.is_empty() {
            return Err(Error::EmptyBatch);
        }
        options.validate()?;

        let token = self.controller.reset();
        let mut batch = resources;
        let mut depth = 0;

        loop {
            self.events.emit_load_start(&LoadStartEvent {
                source: batch.clone(),
            });

            let Some(parser) = self.expander.find(&batch) else {
                break;
            };
            let manifest = batch[0].clone();

            if depth == MAX_MANIFEST_DEPTH {
                let error = Error::manifest(
                    manifest.locator.clone(),
                    format!("manifests nested deeper than {MAX_MANIFEST_DEPTH} levels"),
                );
                return Ok(self.end_manifest(manifest, error));
            }

            tracing::info!(manifest = %manifest, depth, "Expanding manifest");
            match self
                .expander
                .expand(self.transport.as_ref(), parser.as_ref(), &manifest, &options, &token)
                .await
            {
                Ok(expanded) => {
                    batch = expanded;
                    depth += 1;
                }
                Err(e) => return Ok(self.end_manifest(manifest, e)),
            }
        }

        let decoder = self.decoders.select(&batch[0], &options)?;

        BatchRun {
            events: &mut self.events,
            transport: Arc::clone(&self.transport),
            decoder,
            controller: &self.controller,
            token,
            options: &options,
            charset: self.default_charset.clone(),
        }
        .run(batch)
        .await
    }

    /// Report a manifest that could not be expanded and end its batch.
    fn end_manifest(&mut self, manifest: Resource, error: Error) -> LoadSummary {
        let mut summary = LoadSummary {
            total: 1,
            was_aborted: self.controller.is_aborting(),
            ..Default::default()
        };
        if error.is_abort() {
            tracing::warn!(manifest = %manifest, "Manifest fetch aborted");
            summary.aborted = 1;
            self.events.emit_abort(&AbortEvent {
                source: manifest.clone(),
                index: None,
                phase: Phase::Manifest,
            });
        } else {
            tracing::warn!(manifest = %manifest, error = %error, "Manifest expansion failed");
            summary.errored = 1;
            self.events.emit_error(&ErrorEvent {
                source: manifest.clone(),
                index: None,
                phase: Phase::Manifest,
                error,
            });
        }
        self.events.emit_load_end(&LoadEndEvent {
            source: vec![manifest],
            summary,
        });
        summary
    }
}
