//! Legacy tag-list file decoding
//!
//! Older deployments kept the tag catalog in a JSON file whose comma-separated
//! list lives under either `tag_list` (preferred) or `tag`.

use serde::Deserialize;
use std::path::Path;

use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct RawTagList {
    #[serde(default)]
    tag_list: Option<String>,
    #[serde(default)]
    tag: Option<String>,
}

/// Which key the tag list was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagListKey {
    /// `tag_list` (preferred)
    TagList,
    /// `tag` (fallback)
    Tag,
}

/// Decoded tag list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagList {
    /// Key the list was found under
    pub key: TagListKey,
    /// Trimmed, non-empty tag names in file order
    pub tags: Vec<String>,
}

impl TagList {
    /// Decode a tag-list JSON document
    ///
    /// Tries `tag_list`, falls back to `tag`, and fails if neither holds a
    /// non-empty string.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawTagList = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("failed to parse tag list: {}", e)))?;

        let (key, list) = match (raw.tag_list, raw.tag) {
            (Some(list), _) if !list.trim().is_empty() => (TagListKey::TagList, list),
            (_, Some(list)) if !list.trim().is_empty() => (TagListKey::Tag, list),
            _ => {
                return Err(Error::InvalidInput(
                    "tag list must contain a non-empty \"tag_list\" or \"tag\" field".to_string(),
                ))
            }
        };

        let tags = list
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self { key, tags })
    }

    /// Read and decode a tag-list file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
