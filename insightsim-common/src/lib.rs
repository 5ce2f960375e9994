//! # InsightSim Common Library
//!
//! Shared code for the InsightSim time-series service including:
//! - Database initialization, migrations and models
//! - Generation progress events
//! - Configuration loading
//! - Timestamp parsing and formatting
//! - Legacy tag-list decoding

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod tag_list;
pub mod time;

pub use error::{Error, Result};
pub use events::GenerationEvent;
