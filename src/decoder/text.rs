//! Plain-text decoder

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::traits::{DecodeContext, Decoder, DecoderControl, DecoderOptions};
use crate::config::LoadOptions;
use crate::error::{Error, Result};
use crate::types::{Payload, PayloadKind, Resource};

/// Decoder that yields each payload as a `String`
///
/// Accepts resources by file extension (`txt` by default). Text payloads are passed
/// through; binary payloads handed to it directly are decoded with the batch's
/// default character set.
///
/// # Examples
///
/// ```
/// use batch_loader::decoder::{DecodeContext, Decoder, TextDecoder};
/// use batch_loader::{LoadOptions, Payload, Resource};
///
/// # #[tokio::main]
/// # async fn main() -> batch_loader::Result<()> {
/// let decoder = TextDecoder::with_extensions(["txt", "csv"]);
/// let resource = Resource::new("notes.csv");
/// assert!(decoder.can_decode(&resource, &LoadOptions::default()));
///
/// let text = decoder
///     .decode(Payload::Text("a,b".into()), &resource, DecodeContext::detached(0))
///     .await?;
/// assert_eq!(text, "a,b");
/// # Ok(())
/// # }
/// ```
pub struct TextDecoder {
    extensions: Vec<String>,
    charset: Mutex<Option<String>>,
    active: AtomicUsize,
    aborted: AtomicBool,
}

impl TextDecoder {
    /// Decoder for `.txt` resources
    pub fn new() -> Self {
        Self::with_extensions(["txt"])
    }

    /// Decoder for the given extensions (case-insensitive, without the dot)
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            charset: Mutex::new(None),
            active: AtomicUsize::new(0),
            aborted: AtomicBool::new(false),
        }
    }

    fn charset(&self) -> Option<String> {
        self.charset
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the active-decode count accurate even if the decode future is dropped.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl<'a> ActiveGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DecoderControl for TextDecoder {
    fn is_loading(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Decoder for TextDecoder {
    type Output = String;

    fn name(&self) -> &'static str {
        "text"
    }

    fn can_decode(&self, resource: &Resource, _options: &LoadOptions) -> bool {
        resource
            .extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Text
    }

    fn configure(&self, options: &DecoderOptions) {
        *self
            .charset
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = options.default_charset.clone();
        self.aborted.store(false, Ordering::SeqCst);
    }

    async fn decode(&self, payload: Payload, resource: &Resource, ctx: DecodeContext) -> Result<String> {
        let _guard = ActiveGuard::enter(&self.active);
        if ctx.is_cancelled() || self.aborted.load(Ordering::SeqCst) {
            return Err(Error::Aborted);
        }

        let text = match payload {
            Payload::Text(text) => text,
            Payload::Binary(bytes) => crate::utils::decode_text(&bytes, self.charset().as_deref())
                .map_err(|e| Error::decode(resource.locator.clone(), e.to_string()))?,
        };
        Ok(text)
    }
}
