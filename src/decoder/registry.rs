//! Ordered decoder registry and per-batch selection.

use std::sync::Arc;

use crate::config::LoadOptions;
use crate::error::{Error, Result};
use crate::types::Resource;

use super::traits::Decoder;

/// Shared handle to a decoder producing `T`
pub type DecoderRef<T> = Arc<dyn Decoder<Output = T>>;

/// Decoders in registration order
pub struct DecoderRegistry<T> {
    decoders: Vec<DecoderRef<T>>,
}

impl<T> Default for DecoderRegistry<T> {
    fn default() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }
}

impl<T: Send + 'static> DecoderRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decoder; earlier registrations win ties.
    pub fn register(&mut self, decoder: DecoderRef<T>) {
        tracing::debug!(decoder = decoder.name(), "Registered decoder");
        self.decoders.push(decoder);
    }

    /// Number of registered decoders
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// True when no decoder is registered
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Names of the registered decoders, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    /// Pick the first decoder that accepts `representative`.
    ///
    /// # Errors
    ///
    /// [`Error::NoDecoder`] when every decoder declines.
    pub fn select(&self, representative: &Resource, options: &LoadOptions) -> Result<DecoderRef<T>> {
        self.decoders
            .iter()
            .find(|d| d.can_decode(representative, options))
            .cloned()
            .ok_or_else(|| Error::NoDecoder {
                resource: representative.locator.clone(),
            })
    }
}
