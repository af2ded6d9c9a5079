//! Content decoders
//!
//! Decoders are external collaborators of the scheduler: it only needs their
//! capability check, payload kind and decode entry point. This module defines that
//! seam, the ordered registry used for per-batch selection, and a plain-text decoder.

mod registry;
mod text;
mod traits;

pub use registry::{DecoderRef, DecoderRegistry};
pub use text::TextDecoder;
pub use traits::{DecodeContext, Decoder, DecoderControl, DecoderOptions};
