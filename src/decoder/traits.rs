//! Traits and types for content decoders

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::LoadOptions;
use crate::progress::ProgressSink;
use crate::types::{Payload, PayloadKind, Phase, Resource};

/// Settings pushed to the selected decoder before a batch starts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Number of concurrent fetch slots for the batch
    pub batch_size: usize,
    /// Character set the scheduler forces onto text payloads, if any
    pub default_charset: Option<String>,
}

/// Per-item context handed to [`Decoder::decode`]
///
/// Lets the decoder report decode-phase progress and observe the batch's
/// cancellation state. Cancellation is cooperative: a decoder that never checks it
/// simply runs to completion.
#[derive(Clone, Debug)]
pub struct DecodeContext {
    index: usize,
    progress: ProgressSink,
    cancel_token: CancellationToken,
}

impl DecodeContext {
    pub(crate) fn new(index: usize, progress: ProgressSink, cancel_token: CancellationToken) -> Self {
        Self {
            index,
            progress,
            cancel_token,
        }
    }

    /// A context not attached to any batch (for calling a decoder directly).
    pub fn detached(index: usize) -> Self {
        Self {
            index,
            progress: ProgressSink::detached(Phase::Decode),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Index of the item being decoded
    pub fn index(&self) -> usize {
        self.index
    }

    /// Report decode progress (`loaded` of `total` units).
    pub fn report_progress(&self, loaded: u64, total: u64) {
        self.progress.report(loaded, Some(total));
    }

    /// True once the batch has been aborted
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Resolves when the batch is aborted
    pub async fn cancelled(&self) {
        self.cancel_token.cancelled().await;
    }
}

/// Busy-state and cancellation surface of a decoder
///
/// Split from [`Decoder`] so the cancellation controller can hold the active decoder
/// without knowing its output type.
pub trait DecoderControl: Send + Sync {
    /// Whether a decode is currently running
    fn is_loading(&self) -> bool;

    /// Request cancellation of running decodes
    fn abort(&self);
}

/// A pluggable content decoder
///
/// The scheduler selects one decoder per batch by calling [`can_decode`](Self::can_decode)
/// on the batch's first resource, in registration order, and applies it to every item.
///
/// # Examples
///
/// ```
/// use batch_loader::decoder::{DecodeContext, Decoder, DecoderControl};
/// use batch_loader::{LoadOptions, Payload, PayloadKind, Resource, Result};
///
/// struct ByteCount;
///
/// impl DecoderControl for ByteCount {
///     fn is_loading(&self) -> bool { false }
///     fn abort(&self) {}
/// }
///
/// #[async_trait::async_trait]
/// impl Decoder for ByteCount {
///     type Output = usize;
///
///     fn name(&self) -> &'static str { "byte-count" }
///
///     fn can_decode(&self, _resource: &Resource, _options: &LoadOptions) -> bool { true }
///
///     fn payload_kind(&self) -> PayloadKind { PayloadKind::Binary }
///
///     async fn decode(&self, payload: Payload, _resource: &Resource, _ctx: DecodeContext) -> Result<usize> {
///         Ok(payload.len())
///     }
/// }
/// ```
#[async_trait]
pub trait Decoder: DecoderControl {
    /// Domain data produced for each item
    type Output: Send + 'static;

    /// Human-readable name for logging and error messages
    fn name(&self) -> &'static str;

    /// Whether this decoder handles `resource`
    fn can_decode(&self, resource: &Resource, options: &LoadOptions) -> bool;

    /// Payload representation to request from the transport
    fn payload_kind(&self) -> PayloadKind;

    /// Whether [`decode`](Self::decode) reports progress through its context
    ///
    /// When true the decode phase weighs as much as the fetch phase in the batch
    /// progress.
    fn reports_progress(&self) -> bool {
        false
    }

    /// Receive batch settings before any item is decoded
    fn configure(&self, _options: &DecoderOptions) {}

    /// Turn one fetched payload into domain data
    ///
    /// # Errors
    ///
    /// Returns [`Error::Aborted`](crate::Error::Aborted) when the decode stopped because
    /// of an abort, or any other error when the payload could not be decoded.
    async fn decode(
        &self,
        payload: Payload,
        resource: &Resource,
        ctx: DecodeContext,
    ) -> crate::Result<Self::Output>;
}
