//! # batch-loader
//!
//! Batched, cancellable loading of remote resources through pluggable decoders.
//!
//! ## Design Philosophy
//!
//! batch-loader is designed to be:
//! - **Bounded** - At most `batch_size` fetches are in flight; the rest wait in index order
//! - **Exactly-once** - *load* and *load-end* fire once per batch whatever happens to the items
//! - **Cancellable** - One `abort()` stops dispatch, drops in-flight requests and reaches the decoder
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use batch_loader::decoder::TextDecoder;
//! use batch_loader::{Config, FetchScheduler, LoadOptions, Resource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut scheduler: FetchScheduler<String> = FetchScheduler::new(Config::default())?;
//!     scheduler.register_decoder(TextDecoder::new());
//!
//!     scheduler
//!         .on_progress(|e| println!("{:.0}%", e.loaded))
//!         .on_load_item(|e| println!("{}: {} bytes", e.source, e.data.len()))
//!         .on_error(|e| eprintln!("{}: {}", e.source, e.error));
//!
//!     let summary = scheduler
//!         .load(
//!             vec![
//!                 Resource::new("https://example.com/a.txt"),
//!                 Resource::new("https://example.com/b.txt"),
//!             ],
//!             LoadOptions { batch_size: Some(2), ..Default::default() },
//!         )
//!         .await?;
//!     println!("{summary:?}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Batch cancellation
pub mod cancel;
/// Configuration types
pub mod config;
/// Content decoders and decoder selection
pub mod decoder;
/// Error types
pub mod error;
/// Lifecycle event handlers
pub mod events;
/// Manifest (indirection) expansion
pub mod manifest;
/// Progress aggregation
pub mod progress;
/// Batch scheduler (sliding window, counters, run loop)
pub mod scheduler;
/// Network transport seam and HTTP implementation
pub mod transport;
/// Core types (resources, payloads, events)
pub mod types;
/// Locator and text helpers
pub mod utils;

// Re-export commonly used types
pub use cancel::{AbortHandle, CancellationController};
pub use config::{Config, LoadOptions, ManifestConfig, RequestHeader, TransportConfig};
pub use decoder::{Decoder, DecoderControl, DecoderRegistry, TextDecoder};
pub use error::{Error, Result};
pub use events::LifecycleEmitter;
pub use manifest::{IndirectionExpander, JsonManifestParser, ManifestParser};
pub use progress::{ProgressAggregator, ProgressSink};
pub use scheduler::FetchScheduler;
pub use transport::{FetchRequest, FetchResponse, HttpTransport, Transport};
pub use types::{
    AbortEvent, ErrorEvent, LoadEndEvent, LoadEvent, LoadItemEvent, LoadStartEvent, LoadSummary,
    Payload, PayloadKind, Phase, ProgressEvent, Resource,
};
