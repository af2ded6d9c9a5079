//! Progress aggregation across the items of a batch.
//!
//! Each item progresses independently through a fetch phase and, when the decoder
//! reports it, a decode phase. [`ProgressAggregator`] folds the per-item, per-phase
//! fractions into one overall percentage for the batch. Updates are produced by
//! [`ProgressSink`]s handed to transports and decoders and consumed by the scheduler
//! loop, which is the only place the aggregator is mutated.

use tokio::sync::mpsc;

use crate::types::Phase;

/// Scale of the aggregated progress value
pub const PROGRESS_SCALE: f64 = 100.0;

/// A raw progress report for one item and phase
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressUpdate {
    /// Index of the item in the batch
    pub index: usize,
    /// Phase the report refers to
    pub phase: Phase,
    /// Units completed so far (usually bytes)
    pub loaded: u64,
    /// Total units, when known
    pub total: Option<u64>,
}

impl ProgressUpdate {
    /// Completed fraction in [0, 1], or `None` when the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.loaded as f64 / total as f64).clamp(0.0, 1.0)),
            None => None,
        }
    }
}

/// Handle through which a fetch or decode operation reports progress
///
/// Cheap to clone. A detached sink (no receiver) silently drops reports.
#[derive(Clone, Debug)]
pub struct ProgressSink {
    index: usize,
    phase: Phase,
    tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl ProgressSink {
    pub(crate) fn new(index: usize, phase: Phase, tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        Self {
            index,
            phase,
            tx: Some(tx),
        }
    }

    /// A sink that reports nowhere (manifest fetches, tests).
    pub fn detached(phase: Phase) -> Self {
        Self {
            index: 0,
            phase,
            tx: None,
        }
    }

    /// Index of the item this sink reports for
    pub fn index(&self) -> usize {
        self.index
    }

    /// Report `loaded` units out of `total` (None when the length is unknown).
    pub fn report(&self, loaded: u64, total: Option<u64>) {
        if let Some(tx) = &self.tx {
            // Receiver gone means the batch already ended.
            let _ = tx.send(ProgressUpdate {
                index: self.index,
                phase: self.phase,
                loaded,
                total,
            });
        }
    }
}

/// Combines per-item phase fractions into one monotone batch percentage
///
/// Overall progress is `Σ_i Σ_phase fraction(i, phase) × weight(phase)` normalised by
/// the batch size and scaled to [`PROGRESS_SCALE`]. Each (item, phase) slot only ever
/// moves forward: an update lower than the recorded fraction is ignored, so a phase
/// starting at 0 never takes back what an earlier phase already counted.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    fetch: Vec<f64>,
    decode: Vec<f64>,
    decode_weighted: bool,
}

impl ProgressAggregator {
    /// Create an aggregator for `count` items.
    ///
    /// When `with_decode_phase` is true the fetch and decode phases weigh 1/2 each;
    /// otherwise the fetch phase carries the whole item.
    pub fn new(count: usize, with_decode_phase: bool) -> Self {
        Self {
            fetch: vec![0.0; count],
            decode: vec![0.0; count],
            decode_weighted: with_decode_phase,
        }
    }

    /// Number of items tracked
    pub fn len(&self) -> usize {
        self.fetch.len()
    }

    /// True when tracking no items
    pub fn is_empty(&self) -> bool {
        self.fetch.is_empty()
    }

    /// Weight of one phase within an item
    pub fn phase_weight(&self, phase: Phase) -> f64 {
        match (phase, self.decode_weighted) {
            (Phase::Fetch, true) | (Phase::Decode, true) => 0.5,
            (Phase::Fetch, false) => 1.0,
            (Phase::Decode, false) | (Phase::Manifest, _) => 0.0,
        }
    }

    /// Record `fraction` for an item's phase and return the overall percentage.
    ///
    /// Out-of-range indices and non-item phases leave the state untouched.
    pub fn update(&mut self, index: usize, phase: Phase, fraction: f64) -> f64 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let slot = match phase {
            Phase::Fetch => self.fetch.get_mut(index),
            Phase::Decode => self.decode.get_mut(index),
            Phase::Manifest => None,
        };
        if let Some(slot) = slot
            && fraction > *slot
        {
            *slot = fraction;
        }
        self.overall()
    }

    /// Mark an item's phase as finished.
    pub fn complete(&mut self, index: usize, phase: Phase) -> f64 {
        self.update(index, phase, 1.0)
    }

    /// Fraction recorded for one item's phase
    pub fn item_fraction(&self, index: usize, phase: Phase) -> f64 {
        let slot = match phase {
            Phase::Fetch => self.fetch.get(index),
            Phase::Decode => self.decode.get(index),
            Phase::Manifest => None,
        };
        slot.copied().unwrap_or(0.0)
    }

    /// Overall progress in [0, [`PROGRESS_SCALE`]]
    pub fn overall(&self) -> f64 {
        if self.fetch.is_empty() {
            return 0.0;
        }
        let fetch_weight = self.phase_weight(Phase::Fetch);
        let decode_weight = self.phase_weight(Phase::Decode);
        let sum: f64 = self
            .fetch
            .iter()
            .zip(&self.decode)
            .map(|(f, d)| f * fetch_weight + d * decode_weight)
            .sum();
        (sum / self.fetch.len() as f64 * PROGRESS_SCALE).min(PROGRESS_SCALE)
    }
}
