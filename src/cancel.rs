//! Batch cancellation
//!
//! [`CancellationController`] owns the cancellation token of the current batch and
//! the decoder serving it. `abort()` cancels the token, which every in-flight fetch
//! selects on, and asks the decoder to stop if it reports itself busy. The sliding
//! window checks the token before each dispatch, so nothing new is sent once it is
//! cancelled.
//!
//! The controller is shared: the scheduler keeps one, and every [`AbortHandle`] is a
//! clone of it, so a handle obtained before a batch still targets whatever batch is
//! running when it is used.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::decoder::DecoderControl;

struct Inner {
    token: CancellationToken,
    decoder: Option<Arc<dyn DecoderControl>>,
}

/// Tracks the abort flag of the current batch and propagates aborts
#[derive(Clone)]
pub struct CancellationController {
    inner: Arc<Mutex<Inner>>,
}

impl Default for CancellationController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CancellationController")
            .field("aborting", &inner.token.is_cancelled())
            .field("has_decoder", &inner.decoder.is_some())
            .finish()
    }
}

impl CancellationController {
    /// Controller with a fresh, uncancelled token
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                token: CancellationToken::new(),
                decoder: None,
            })),
        }
    }

    // Poisoning cannot leave the two fields inconsistent.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new batch: clear the abort flag and forget the previous decoder.
    ///
    /// Returns the token the batch's operations observe.
    pub fn reset(&self) -> CancellationToken {
        let mut inner = self.lock();
        inner.token = CancellationToken::new();
        inner.decoder = None;
        inner.token.clone()
    }

    /// Record the decoder serving the current batch.
    pub fn set_decoder(&self, decoder: Arc<dyn DecoderControl>) {
        self.lock().decoder = Some(decoder);
    }

    /// Token of the current batch
    pub fn token(&self) -> CancellationToken {
        self.lock().token.clone()
    }

    /// Abort the current batch.
    ///
    /// Idempotent. Cancels every in-flight fetch, stops further dispatch and, when
    /// the active decoder is busy, asks it to abort.
    pub fn abort(&self) {
        // Release the lock before calling into the decoder.
        let decoder = {
            let inner = self.lock();
            if inner.token.is_cancelled() {
                return;
            }
            inner.token.cancel();
            inner.decoder.clone()
        };
        tracing::info!("Abort requested");

        if let Some(decoder) = decoder
            && decoder.is_loading()
        {
            tracing::debug!("Aborting busy decoder");
            decoder.abort();
        }
    }

    /// Whether the current batch has been aborted
    pub fn is_aborting(&self) -> bool {
        self.lock().token.is_cancelled()
    }
}

/// Cloneable handle for aborting a scheduler's running batch
///
/// Obtained from [`FetchScheduler::abort_handle`](crate::FetchScheduler::abort_handle).
/// Safe to move into event handlers or other tasks; aborting when no batch is running
/// only sets the flag, and the next batch starts with it cleared.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    controller: CancellationController,
}

impl AbortHandle {
    pub(crate) fn new(controller: CancellationController) -> Self {
        Self { controller }
    }

    /// Abort the running batch (idempotent)
    pub fn abort(&self) {
        self.controller.abort();
    }

    /// Whether the running batch has been aborted
    pub fn is_aborting(&self) -> bool {
        self.controller.is_aborting()
    }
}
