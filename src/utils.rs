//! Locator and text helpers shared by the transport, manifest and scheduler modules.

use crate::error::{Error, Result};

/// Extract the last path segment of a locator, percent-decoded.
///
/// Works for absolute URLs (via [`url::Url`]) and for relative paths, ignoring any
/// query string or fragment. Returns `None` when the locator ends with a separator.
///
/// # Examples
///
/// ```
/// use batch_loader::utils::file_name;
///
/// assert_eq!(file_name("http://host/study/DICOMDIR").as_deref(), Some("DICOMDIR"));
/// assert_eq!(file_name("images/a%20b.txt?v=2").as_deref(), Some("a b.txt"));
/// assert_eq!(file_name("http://host/dir/"), None);
/// ```
pub fn file_name(locator: &str) -> Option<String> {
    let raw = if let Ok(parsed) = url::Url::parse(locator)
        && !parsed.cannot_be_a_base()
    {
        let mut segments = parsed.path_segments()?;
        segments.next_back()?.to_string()
    } else {
        let path = strip_query(locator);
        path.rsplit(['/', '\\']).next()?.to_string()
    };

    if raw.is_empty() {
        return None;
    }
    match urlencoding::decode(&raw) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(raw),
    }
}

/// Directory part of a relative locator, always ending with `/`.
///
/// A bare file name lives in `./`.
/// Backslash separators are normalised to `/`.
pub fn base_directory(locator: &str) -> String {
    let path = strip_query(locator).replace('\\', "/");
    match path.rfind('/') {
        Some(pos) => path[..=pos].to_string(),
        None => "./".to_string(),
    }
}

/// Resolve a manifest entry against the manifest's own location.
///
/// Backslash-separated entries (`IMAGES\IMG001`) are normalised to `/` first.
/// Absolute entries are returned unchanged; relative entries are joined onto the
/// manifest's directory.
pub fn qualify(manifest_locator: &str, entry: &str) -> Result<String> {
    let entry = entry.trim().replace('\\', "/");
    if entry.is_empty() {
        return Err(Error::manifest(manifest_locator, "empty file entry"));
    }
    if url::Url::parse(&entry).is_ok() {
        return Ok(entry);
    }

    if let Ok(base) = url::Url::parse(manifest_locator) {
        return base
            .join(&entry)
            .map(String::from)
            .map_err(|e| Error::manifest(manifest_locator, format!("invalid entry {entry:?}: {e}")));
    }

    let relative = entry.strip_prefix("./").unwrap_or(&entry);
    Ok(format!("{}{}", base_directory(manifest_locator), relative))
}

/// Extract the `charset` parameter from a `Content-Type` header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

/// Decode a text body using the given character set label (UTF-8 when `None`).
///
/// Labels are resolved the way browsers resolve them (`latin1` and `us-ascii` both
/// map to windows-1252). A byte-order mark takes precedence over the label, and
/// malformed sequences are replaced with U+FFFD rather than failing the item.
pub fn decode_text(bytes: &[u8], charset: Option<&str>) -> Result<String> {
    let encoding = match charset.map(str::trim) {
        None => encoding_rs::UTF_8,
        Some(label) => encoding_rs::Encoding::for_label(label.as_bytes())
            .ok_or_else(|| Error::UnsupportedCharset(label.to_string()))?,
    };
    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}

/// Decode a fetched text body.
///
/// A `forced` charset (the caller's default) wins and must be known. Otherwise the
/// charset `declared` by the response is used, and an unknown declared label falls
/// back to UTF-8.
pub fn decode_body(bytes: &[u8], forced: Option<&str>, declared: Option<&str>) -> Result<String> {
    if forced.is_some() {
        return decode_text(bytes, forced);
    }
    match decode_text(bytes, declared) {
        Err(Error::UnsupportedCharset(label)) => {
            tracing::warn!(charset = %label, "Unknown response charset, decoding as UTF-8");
            decode_text(bytes, None)
        }
        other => other,
    }
}

fn strip_query(locator: &str) -> &str {
    let end = locator.find(['?', '#']).unwrap_or(locator.len());
    &locator[..end]
}
