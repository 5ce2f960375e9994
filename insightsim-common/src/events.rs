//! Generation progress events
//!
//! A generator run produces a finite, ordered sequence of these events:
//! zero or more `TagComplete`, then exactly one terminal `Done` or `Error`.
//! They are serialized one JSON object per line (NDJSON) for HTTP streaming.

use serde::{Deserialize, Serialize};

/// Progress event emitted by the synthetic generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// All ticks for one tag have been written and committed
    TagComplete {
        /// Tag that finished
        tag: String,
        /// Rows written or updated for this tag
        records: u64,
    },

    /// Run finished successfully (terminal)
    Done {
        /// Total rows written or updated across all tags
        count: u64,
        /// Number of tags generated
        tags_count: usize,
    },

    /// Run aborted (terminal); committed batches are not rolled back
    Error {
        /// Human-readable failure description
        message: String,
    },
}

impl GenerationEvent {
    /// Event type name as it appears in the `event` field
    pub fn event_type(&self) -> &'static str {
        match self {
            GenerationEvent::TagComplete { .. } => "tag_complete",
            GenerationEvent::Done { .. } => "done",
            GenerationEvent::Error { .. } => "error",
        }
    }

    /// True for `Done` and `Error`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationEvent::TagComplete { .. })
    }

    /// Serialize as one NDJSON line (trailing newline included)
    pub fn to_ndjson_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"event":"error","message":"failed to serialize event: {}"}}"#, e)
        });
        line.push('\n');
        line
    }
}
