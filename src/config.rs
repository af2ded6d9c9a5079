//! Configuration types for batch-loader

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single request header sent with every fetch of a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Header name (e.g. "Authorization")
    pub name: String,
    /// Header value
    pub value: String,
}

impl RequestHeader {
    /// Create a header from a name/value pair
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Options recognized by a single `load` call
///
/// Carried unchanged into the expanded batch when the input is a manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Headers added to every request, in order
    #[serde(default)]
    pub request_headers: Vec<RequestHeader>,

    /// Send credentials embedded in the locator (default: false)
    ///
    /// A [`Resource`](crate::Resource) may override this per item.
    #[serde(default)]
    pub with_credentials: bool,

    /// Maximum number of fetches in flight at once (None = whole batch)
    ///
    /// Capped to the batch length. Zero is rejected.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

impl LoadOptions {
    /// Reject option values that can never be satisfied.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == Some(0) {
            return Err(Error::config(
                "batch_size",
                "batch_size must be a positive integer",
            ));
        }
        for header in &self.request_headers {
            if header.name.trim().is_empty() {
                return Err(Error::config(
                    "request_headers",
                    "request header names must not be empty",
                ));
            }
        }
        Ok(())
    }

    /// Number of concurrent fetch slots for a batch of `count` resources.
    pub fn effective_batch_size(&self, count: usize) -> usize {
        self.batch_size.unwrap_or(count).min(count).max(1)
    }
}

/// HTTP transport settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportConfig {
    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Connect timeout in seconds (None = transport default)
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    /// Whole-request timeout in seconds (None = no timeout)
    ///
    /// The scheduler itself never times out a fetch; a stalled request is left to
    /// this setting.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: None,
            request_timeout_secs: None,
        }
    }
}

impl TransportConfig {
    /// Connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Manifest (indirection resource) detection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// File names that mark a resource as a manifest, compared case-insensitively
    /// with the locator's last path segment (default: `["manifest.json"]`)
    #[serde(default = "default_manifest_names")]
    pub file_names: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            file_names: default_manifest_names(),
        }
    }
}

/// Main configuration for [`FetchScheduler`](crate::FetchScheduler)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP transport settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Manifest detection settings
    #[serde(default)]
    pub manifest: ManifestConfig,

    /// Character set forced onto text payloads (None = use the response's)
    #[serde(default)]
    pub default_charset: Option<String>,

    /// Default options for `load` calls that do not supply their own
    #[serde(default)]
    pub load: LoadOptions,
}

fn default_user_agent() -> String {
    concat!("batch-loader/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_manifest_names() -> Vec<String> {
    vec!["manifest.json".to_string()]
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert!(cfg.transport.user_agent.starts_with("batch-loader/"));
        assert!(cfg.transport.request_timeout().is_none());
        assert!(cfg.transport.connect_timeout().is_none());
        assert_eq!(cfg.manifest.file_names, vec!["manifest.json".to_string()]);
        assert!(cfg.default_charset.is_none());
        assert_eq!(cfg.load, LoadOptions::default());
    }

    #[test]
    fn config_json_roundtrip() {
        let mut cfg = Config::default();
        cfg.default_charset = Some("iso-8859-1".to_string());
        cfg.load.batch_size = Some(4);
        cfg.load
            .request_headers
            .push(RequestHeader::new("Accept", "application/dicom"));

        let json = serde_json::to_string(&cfg).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.default_charset.as_deref(), Some("iso-8859-1"));
        assert_eq!(parsed.load, cfg.load);
    }

    #[test]
    fn config_from_empty_json_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.manifest.file_names, vec!["manifest.json".to_string()]);
        assert!(cfg.load.batch_size.is_none());
        assert!(!cfg.load.with_credentials);
    }

    #[test]
    fn load_options_custom_values() {
        let json = r#"{
            "request_headers": [{"name": "X-Token", "value": "abc"}],
            "with_credentials": true,
            "batch_size": 2
        }"#;
        let opts: LoadOptions = serde_json::from_str(json).unwrap();
        assert!(opts.with_credentials);
        assert_eq!(opts.batch_size, Some(2));
        assert_eq!(opts.request_headers[0], RequestHeader::new("X-Token", "abc"));
    }

    #[test]
    fn effective_batch_size_defaults_to_batch_length() {
        let opts = LoadOptions::default();
        assert_eq!(opts.effective_batch_size(7), 7);
    }

    #[test]
    fn effective_batch_size_is_capped_to_batch_length() {
        let opts = LoadOptions {
            batch_size: Some(50),
            ..Default::default()
        };
        assert_eq!(opts.effective_batch_size(3), 3);
        let opts = LoadOptions {
            batch_size: Some(2),
            ..Default::default()
        };
        assert_eq!(opts.effective_batch_size(3), 2);
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let opts = LoadOptions {
            batch_size: Some(0),
            ..Default::default()
        };
        let err = opts.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "batch_size"));
    }

    #[test]
    fn validate_rejects_blank_header_name() {
        let opts = LoadOptions {
            request_headers: vec![RequestHeader::new("  ", "v")],
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }
}
