//! Lifecycle event handlers
//!
//! Every hook defaults to a no-op. Registering a handler replaces the previous one.
//! Handlers run on the scheduler's control flow, one at a time, and each runs to
//! completion before the next event is raised.

use crate::types::{
    AbortEvent, ErrorEvent, LoadEndEvent, LoadEvent, LoadItemEvent, LoadStartEvent, ProgressEvent,
};

type Handler<E> = Box<dyn FnMut(&E) + Send>;

/// The set of named lifecycle hooks of a [`FetchScheduler`](crate::FetchScheduler)
///
/// `T` is the decoder output carried by item events, which are passed by value so
/// handlers can keep the decoded data without cloning.
pub struct LifecycleEmitter<T> {
    load_start: Handler<LoadStartEvent>,
    progress: Handler<ProgressEvent>,
    load_item: Box<dyn FnMut(LoadItemEvent<T>) + Send>,
    load: Handler<LoadEvent>,
    load_end: Handler<LoadEndEvent>,
    error: Handler<ErrorEvent>,
    abort: Handler<AbortEvent>,
}

impl<T> Default for LifecycleEmitter<T> {
    fn default() -> Self {
        Self {
            load_start: Box::new(|_| {}),
            progress: Box::new(|_| {}),
            load_item: Box::new(|_| {}),
            load: Box::new(|_| {}),
            load_end: Box::new(|_| {}),
            error: Box::new(|_| {}),
            abort: Box::new(|_| {}),
        }
    }
}

impl<T> std::fmt::Debug for LifecycleEmitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEmitter").finish_non_exhaustive()
    }
}

impl<T> LifecycleEmitter<T> {
    /// Emitter with every hook set to a no-op
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler fired when a batch starts
    pub fn on_load_start(&mut self, handler: impl FnMut(&LoadStartEvent) + Send + 'static) -> &mut Self {
        self.load_start = Box::new(handler);
        self
    }

    /// Set the handler fired on fetch or decode progress
    pub fn on_progress(&mut self, handler: impl FnMut(&ProgressEvent) + Send + 'static) -> &mut Self {
        self.progress = Box::new(handler);
        self
    }

    /// Set the handler fired for each decoded item
    pub fn on_load_item(&mut self, handler: impl FnMut(LoadItemEvent<T>) + Send + 'static) -> &mut Self {
        self.load_item = Box::new(handler);
        self
    }

    /// Set the handler fired once every item decoded successfully
    pub fn on_load(&mut self, handler: impl FnMut(&LoadEvent) + Send + 'static) -> &mut Self {
        self.load = Box::new(handler);
        self
    }

    /// Set the handler fired once when the batch ends
    pub fn on_load_end(&mut self, handler: impl FnMut(&LoadEndEvent) + Send + 'static) -> &mut Self {
        self.load_end = Box::new(handler);
        self
    }

    /// Set the handler fired for each per-item failure
    pub fn on_error(&mut self, handler: impl FnMut(&ErrorEvent) + Send + 'static) -> &mut Self {
        self.error = Box::new(handler);
        self
    }

    /// Set the handler fired for each cancelled operation
    pub fn on_abort(&mut self, handler: impl FnMut(&AbortEvent) + Send + 'static) -> &mut Self {
        self.abort = Box::new(handler);
        self
    }

    pub(crate) fn emit_load_start(&mut self, event: &LoadStartEvent) {
        (self.load_start)(event);
    }

    pub(crate) fn emit_progress(&mut self, event: &ProgressEvent) {
        (self.progress)(event);
    }

    pub(crate) fn emit_load_item(&mut self, event: LoadItemEvent<T>) {
        (self.load_item)(event);
    }

    pub(crate) fn emit_load(&mut self, event: &LoadEvent) {
        (self.load)(event);
    }

    pub(crate) fn emit_load_end(&mut self, event: &LoadEndEvent) {
        (self.load_end)(event);
    }

    pub(crate) fn emit_error(&mut self, event: &ErrorEvent) {
        (self.error)(event);
    }

    pub(crate) fn emit_abort(&mut self, event: &AbortEvent) {
        (self.abort)(event);
    }
}
