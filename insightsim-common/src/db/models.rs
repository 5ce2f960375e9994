//! Database models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Quality code written by the generator and the CSV importer
pub const GOOD_QUALITY: i64 = 3;

/// One persisted sample, keyed by `(tag, timestamp_ms)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub tag: String,
    /// Milliseconds since epoch, UTC
    pub timestamp_ms: i64,
    pub value: f64,
    pub quality: i64,
}

impl Sample {
    pub fn new(tag: impl Into<String>, timestamp_ms: i64, value: f64, quality: i64) -> Self {
        Self {
            tag: tag.into(),
            timestamp_ms,
            value,
            quality,
        }
    }
}

/// Wire form of a sample: ISO-8601 timestamp text instead of epoch millis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: String,
    pub value: f64,
    pub quality: i64,
}

/// Where a tag registry row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    /// Feed file / JSON ingest
    Load,
    /// CSV upload
    Upload,
    /// Created explicitly through the registry
    Custom,
}

impl TagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagSource::Load => "load",
            TagSource::Upload => "upload",
            TagSource::Custom => "custom",
        }
    }
}

impl Default for TagSource {
    fn default() -> Self {
        TagSource::Custom
    }
}

impl fmt::Display for TagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "load" => Ok(TagSource::Load),
            "upload" => Ok(TagSource::Upload),
            "custom" => Ok(TagSource::Custom),
            other => Err(Error::InvalidInput(format!(
                "invalid tag source '{}' (expected load, upload or custom)",
                other
            ))),
        }
    }
}

/// Row of the `tags` registry table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagRecord {
    pub tag: String,
    pub created_at: String,
    pub updated_at: String,
    pub source: String,
}
