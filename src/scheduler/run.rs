//! The run loop of one batch
//!
//! Fetch and decode futures share one `FuturesUnordered`; progress reports arrive
//! on an unbounded channel. The loop handles one completion or report at a time,
//! so every handler and counter update happens on this single control flow.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::batch::BatchState;
use super::window::SlidingWindow;
use crate::cancel::CancellationController;
use crate::config::LoadOptions;
use crate::decoder::{DecodeContext, DecoderControl, DecoderOptions, DecoderRef};
use crate::error::{Error, Result};
use crate::events::LifecycleEmitter;
use crate::progress::{PROGRESS_SCALE, ProgressSink, ProgressUpdate};
use crate::transport::{FetchRequest, FetchResponse, Transport};
use crate::types::{
    AbortEvent, ErrorEvent, LoadEndEvent, LoadEvent, LoadItemEvent, LoadSummary, Payload, PayloadKind,
    Phase, ProgressEvent, Resource,
};
use crate::utils::decode_body;

enum Completion<T> {
    Fetched {
        index: usize,
        result: Result<FetchResponse>,
    },
    Decoded {
        index: usize,
        result: Result<T>,
    },
}

enum Step<T> {
    Progress(ProgressUpdate),
    Completed(Completion<T>),
}

type InFlight<T> = FuturesUnordered<BoxFuture<'static, Completion<T>>>;

/// Everything one batch needs, borrowed from the scheduler for its duration
pub(super) struct BatchRun<'a, T> {
    pub(super) events: &'a mut LifecycleEmitter<T>,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) decoder: DecoderRef<T>,
    pub(super) controller: &'a CancellationController,
    pub(super) token: CancellationToken,
    pub(super) options: &'a LoadOptions,
    pub(super) charset: Option<String>,
}

impl<T: Send + 'static> BatchRun<'_, T> {
    /// Fetch and decode every resource, returning once nothing is in flight.
    ///
    /// # Errors
    ///
    /// Only [`Error::HeterogeneousBatch`]; per-item failures are reported through
    /// the error hook.
    pub(super) async fn run(mut self, resources: Vec<Resource>) -> Result<LoadSummary> {
        let count = resources.len();
        let batch_size = self.options.effective_batch_size(count);
        self.decoder.configure(&DecoderOptions {
            batch_size,
            default_charset: self.charset.clone(),
        });
        let control: Arc<dyn DecoderControl> = self.decoder.clone();
        self.controller.set_decoder(control);

        tracing::info!(
            count,
            batch_size,
            decoder = self.decoder.name(),
            "Starting batch"
        );

        let mut state = BatchState::new(resources, self.decoder.reports_progress());
        let mut window = SlidingWindow::new(count, batch_size);
        let mut in_flight: InFlight<T> = FuturesUnordered::new();
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

        self.refill(&mut state, &mut window, &mut in_flight, &progress_tx)?;

        while !in_flight.is_empty() {
            let step = tokio::select! {
                biased;
                Some(update) = progress_rx.recv() => Step::Progress(update),
                Some(completion) = in_flight.next() => Step::Completed(completion),
                else => break,
            };

            match step {
                Step::Progress(update) => self.on_progress(&mut state, update),
                Step::Completed(completion) => {
                    // Reports sent before the completion belong before it.
                    while let Ok(update) = progress_rx.try_recv() {
                        self.on_progress(&mut state, update);
                    }
                    match completion {
                        Completion::Fetched { index, result } => {
                            window.release();
                            self.on_fetched(&mut state, &mut in_flight, &progress_tx, index, result);
                            self.refill(&mut state, &mut window, &mut in_flight, &progress_tx)?;
                        }
                        Completion::Decoded { index, result } => {
                            self.on_decoded(&mut state, index, result);
                        }
                    }
                }
            }
        }

        let was_aborted = self.token.is_cancelled();
        let summary = state.summary(was_aborted);
        debug_assert!(was_aborted || state.all_ended());
        tracing::info!(
            total = summary.total,
            loaded = summary.loaded,
            errored = summary.errored,
            aborted = summary.aborted,
            skipped = summary.skipped(),
            load_end_count = state.load_end_count(),
            "Batch ended"
        );
        self.events.emit_load_end(&LoadEndEvent {
            source: state.resources().to_vec(),
            summary,
        });
        Ok(summary)
    }

    /// Dispatch pending items into free slots unless the batch is aborting.
    fn refill(
        &mut self,
        state: &mut BatchState,
        window: &mut SlidingWindow,
        in_flight: &mut InFlight<T>,
        progress_tx: &mpsc::UnboundedSender<ProgressUpdate>,
    ) -> Result<()> {
        if self.token.is_cancelled() {
            if window.pending() > 0 {
                tracing::debug!(pending = window.pending(), "Aborting, not dispatching");
            }
            return Ok(());
        }

        while let Some(index) = window.next_dispatch() {
            let resource = state.resource(index);
            if !self.decoder.can_decode(resource, self.options) {
                let error = Error::HeterogeneousBatch {
                    index,
                    resource: resource.locator.clone(),
                    decoder: self.decoder.name(),
                };
                tracing::warn!(
                    index,
                    url = %resource,
                    decoder = self.decoder.name(),
                    "Resource rejected by the batch decoder, cancelling batch"
                );
                self.controller.abort();
                return Err(error);
            }

            let request = FetchRequest::for_resource(resource, self.options, self.decoder.payload_kind());
            tracing::debug!(
                index,
                url = %request.url,
                in_flight = window.in_flight(),
                "Dispatching fetch"
            );
            state.mark_sent(index);
            in_flight.push(fetch_future(
                Arc::clone(&self.transport),
                request,
                ProgressSink::new(index, Phase::Fetch, progress_tx.clone()),
                self.token.clone(),
                index,
            ));
        }
        Ok(())
    }

    fn on_progress(&mut self, state: &mut BatchState, update: ProgressUpdate) {
        let ProgressUpdate { index, phase, .. } = update;
        if !state.accepts_progress(index, phase) {
            return;
        }
        if let Some(fraction) = update.fraction() {
            state.progress.update(index, phase, fraction);
        }
        let event = ProgressEvent {
            source: state.resource(index).clone(),
            index,
            phase,
            item_fraction: state.progress.item_fraction(index, phase),
            loaded: state.progress.overall(),
            total: PROGRESS_SCALE,
        };
        self.events.emit_progress(&event);
    }

    fn on_fetched(
        &mut self,
        state: &mut BatchState,
        in_flight: &mut InFlight<T>,
        progress_tx: &mpsc::UnboundedSender<ProgressUpdate>,
        index: usize,
        result: Result<FetchResponse>,
    ) {
        let resource = state.resource(index).clone();
        match result {
            Ok(response) if response.is_success() => {
                tracing::debug!(
                    index,
                    url = %resource,
                    status = response.status,
                    bytes = response.payload.len(),
                    "Fetch completed"
                );
                state.fetch_succeeded(index);
                let ctx = DecodeContext::new(
                    index,
                    ProgressSink::new(index, Phase::Decode, progress_tx.clone()),
                    self.token.clone(),
                );
                let charsets = Charsets {
                    forced: self.charset.clone(),
                    declared: response.charset,
                };
                in_flight.push(decode_future(
                    Arc::clone(&self.decoder),
                    response.payload,
                    charsets,
                    resource,
                    ctx,
                ));
            }
            Ok(response) => {
                let error = Error::Transport {
                    resource: resource.locator.clone(),
                    status: response.status,
                    status_text: response.status_text,
                };
                self.fetch_failed(state, index, resource, error);
            }
            Err(e) if e.is_abort() => {
                tracing::warn!(index, url = %resource, "Fetch aborted");
                state.fetch_aborted(index);
                self.events.emit_abort(&AbortEvent {
                    source: resource,
                    index: Some(index),
                    phase: Phase::Fetch,
                });
            }
            Err(error) => self.fetch_failed(state, index, resource, error),
        }
    }

    fn fetch_failed(&mut self, state: &mut BatchState, index: usize, resource: Resource, error: Error) {
        tracing::warn!(index, url = %resource, error = %error, "Fetch failed");
        state.fetch_failed(index);
        self.events.emit_error(&ErrorEvent {
            source: resource,
            index: Some(index),
            phase: Phase::Fetch,
            error,
        });
    }

    fn on_decoded(&mut self, state: &mut BatchState, index: usize, result: Result<T>) {
        let resource = state.resource(index).clone();
        match result {
            Ok(data) => {
                tracing::debug!(index, url = %resource, "Item decoded");
                state.decode_loaded(index);
                self.events.emit_load_item(LoadItemEvent {
                    source: resource,
                    index,
                    data,
                });
                if state.take_all_loaded() {
                    tracing::info!(count = state.len(), "All items loaded");
                    self.events.emit_load(&LoadEvent {
                        source: state.resources().to_vec(),
                    });
                }
            }
            Err(e) if e.is_abort() => {
                tracing::warn!(index, url = %resource, "Decode aborted");
                state.decode_aborted(index);
                self.events.emit_abort(&AbortEvent {
                    source: resource,
                    index: Some(index),
                    phase: Phase::Decode,
                });
            }
            Err(error) => {
                tracing::warn!(index, url = %resource, error = %error, "Decode failed");
                state.decode_failed(index);
                self.events.emit_error(&ErrorEvent {
                    source: resource,
                    index: Some(index),
                    phase: Phase::Decode,
                    error,
                });
            }
        }
    }
}

/// A fetch that resolves as aborted as soon as the batch token is cancelled.
///
/// Losing the race drops the transport future, which cancels the request.
fn fetch_future<T: Send + 'static>(
    transport: Arc<dyn Transport>,
    request: FetchRequest,
    progress: ProgressSink,
    cancel_token: CancellationToken,
    index: usize,
) -> BoxFuture<'static, Completion<T>> {
    async move {
        let result = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => Err(Error::Aborted),
            result = transport.fetch(request, progress) => result,
        };
        Completion::Fetched { index, result }
    }
    .boxed()
}

/// Character sets that apply to a fetched body
struct Charsets {
    forced: Option<String>,
    declared: Option<String>,
}

/// Raw bytes bound for a text decoder are turned into text here, so charset
/// failures surface as decode errors of the item.
fn decoder_payload(kind: PayloadKind, payload: Payload, charsets: &Charsets) -> Result<Payload> {
    match (kind, payload) {
        (PayloadKind::Text, Payload::Binary(bytes)) => {
            decode_body(&bytes, charsets.forced.as_deref(), charsets.declared.as_deref()).map(Payload::Text)
        }
        (_, payload) => Ok(payload),
    }
}

fn decode_future<T: Send + 'static>(
    decoder: DecoderRef<T>,
    payload: Payload,
    charsets: Charsets,
    resource: Resource,
    ctx: DecodeContext,
) -> BoxFuture<'static, Completion<T>> {
    async move {
        let index = ctx.index();
        let result = match decoder_payload(decoder.payload_kind(), payload, &charsets) {
            Ok(payload) => decoder.decode(payload, &resource, ctx).await,
            Err(e) => Err(Error::decode(resource.locator.clone(), e.to_string())),
        };
        Completion::Decoded { index, result }
    }
    .boxed()
}
