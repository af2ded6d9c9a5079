//! JSON manifest format

use serde::Deserialize;

use super::ManifestParser;
use crate::config::ManifestConfig;
use crate::error::{Error, Result};
use crate::types::Resource;

#[derive(Debug, Deserialize)]
struct ManifestDocument {
    groups: Vec<FileGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileGroup {
    List(Vec<String>),
    Object { files: Vec<String> },
}

impl FileGroup {
    fn into_files(self) -> Vec<String> {
        match self {
            FileGroup::List(files) | FileGroup::Object { files } => files,
        }
    }
}

/// Manifest listing file groups as JSON
///
/// Accepts either form of group:
///
/// ```json
/// { "groups": [ ["IMG001", "IMG002"], { "files": ["IMG003"] } ] }
/// ```
///
/// A resource is a manifest when its last path segment equals one of the configured
/// file names, ignoring case.
#[derive(Debug, Clone)]
pub struct JsonManifestParser {
    file_names: Vec<String>,
}

impl JsonManifestParser {
    /// Parser recognising the given file names
    pub fn new<I, S>(file_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file_names: file_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parser recognising [`ManifestConfig::file_names`]
    pub fn from_config(config: &ManifestConfig) -> Self {
        Self::new(config.file_names.iter().cloned())
    }
}

impl ManifestParser for JsonManifestParser {
    fn name(&self) -> &'static str {
        "json"
    }

    fn is_manifest(&self, resource: &Resource) -> bool {
        resource
            .file_name()
            .is_some_and(|name| self.file_names.iter().any(|n| n.eq_ignore_ascii_case(&name)))
    }

    fn parse(&self, resource: &Resource, bytes: &[u8]) -> Result<Vec<Vec<String>>> {
        let document: ManifestDocument = serde_json::from_slice(bytes)
            .map_err(|e| Error::manifest(resource.locator.clone(), format!("invalid JSON manifest: {e}")))?;
        Ok(document
            .groups
            .into_iter()
            .map(FileGroup::into_files)
            .collect())
    }
}
