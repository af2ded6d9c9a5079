//! Per-batch bookkeeping
//!
//! One [`BatchState`] exists per batch and is owned by the run loop. Counters
//! follow the two-halves rule: every item contributes 2 to `load_end_count`, one
//! for its fetch conclusion and one for its decode conclusion. An item whose fetch
//! fails or is aborted never decodes, so it contributes both halves at once.

use crate::progress::ProgressAggregator;
use crate::types::{LoadSummary, Phase, Resource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FetchState {
    Unsent,
    Sent,
    Done,
    Errored,
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DecodeState {
    Pending,
    Running,
    Loaded,
    Errored,
    Aborted,
    /// Fetch did not succeed, so there was nothing to decode
    Skipped,
}

#[derive(Debug)]
pub(crate) struct BatchState {
    resources: Vec<Resource>,
    fetch: Vec<FetchState>,
    decode: Vec<DecodeState>,
    loaded_count: usize,
    load_end_count: usize,
    load_fired: bool,
    pub(crate) progress: ProgressAggregator,
}

impl BatchState {
    pub(crate) fn new(resources: Vec<Resource>, with_decode_phase: bool) -> Self {
        let count = resources.len();
        Self {
            resources,
            fetch: vec![FetchState::Unsent; count],
            decode: vec![DecodeState::Pending; count],
            loaded_count: 0,
            load_end_count: 0,
            load_fired: false,
            progress: ProgressAggregator::new(count, with_decode_phase),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.resources.len()
    }

    pub(crate) fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub(crate) fn resource(&self, index: usize) -> &Resource {
        &self.resources[index]
    }

    #[cfg(test)]
    pub(crate) fn fetch_state(&self, index: usize) -> FetchState {
        self.fetch[index]
    }

    #[cfg(test)]
    pub(crate) fn decode_state(&self, index: usize) -> DecodeState {
        self.decode[index]
    }

    pub(crate) fn load_end_count(&self) -> usize {
        self.load_end_count
    }

    pub(crate) fn mark_sent(&mut self, index: usize) {
        debug_assert_eq!(self.fetch[index], FetchState::Unsent);
        self.fetch[index] = FetchState::Sent;
    }

    pub(crate) fn fetch_succeeded(&mut self, index: usize) {
        self.fetch[index] = FetchState::Done;
        self.decode[index] = DecodeState::Running;
        self.load_end_count += 1;
        self.progress.complete(index, Phase::Fetch);
    }

    pub(crate) fn fetch_failed(&mut self, index: usize) {
        self.fetch[index] = FetchState::Errored;
        self.decode[index] = DecodeState::Skipped;
        self.load_end_count += 2;
    }

    pub(crate) fn fetch_aborted(&mut self, index: usize) {
        self.fetch[index] = FetchState::Aborted;
        self.decode[index] = DecodeState::Skipped;
        self.load_end_count += 2;
    }

    pub(crate) fn decode_loaded(&mut self, index: usize) {
        self.decode[index] = DecodeState::Loaded;
        self.loaded_count += 1;
        self.load_end_count += 1;
        self.progress.complete(index, Phase::Decode);
    }

    pub(crate) fn decode_failed(&mut self, index: usize) {
        self.decode[index] = DecodeState::Errored;
        self.load_end_count += 1;
    }

    pub(crate) fn decode_aborted(&mut self, index: usize) {
        self.decode[index] = DecodeState::Aborted;
        self.load_end_count += 1;
    }

    /// Whether a progress report for this item and phase is still relevant.
    pub(crate) fn accepts_progress(&self, index: usize, phase: Phase) -> bool {
        match phase {
            Phase::Fetch => self.fetch.get(index) == Some(&FetchState::Sent),
            Phase::Decode => self.decode.get(index) == Some(&DecodeState::Running),
            Phase::Manifest => false,
        }
    }

    /// True exactly once: the first time every item has decoded successfully.
    pub(crate) fn take_all_loaded(&mut self) -> bool {
        if self.load_fired || self.loaded_count != self.len() {
            return false;
        }
        self.load_fired = true;
        true
    }

    /// Every item reached both a fetch and a decode conclusion.
    pub(crate) fn all_ended(&self) -> bool {
        self.load_end_count == 2 * self.len()
    }

    pub(crate) fn summary(&self, was_aborted: bool) -> LoadSummary {
        let errored = self
            .fetch
            .iter()
            .zip(&self.decode)
            .filter(|(f, d)| **f == FetchState::Errored || **d == DecodeState::Errored)
            .count();
        let aborted = self
            .fetch
            .iter()
            .zip(&self.decode)
            .filter(|(f, d)| **f == FetchState::Aborted || **d == DecodeState::Aborted)
            .count();
        LoadSummary {
            total: self.len(),
            loaded: self.loaded_count,
            errored,
            aborted,
            was_aborted,
        }
    }
}
