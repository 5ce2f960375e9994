//! Storage access for samples and the tag registry
//!
//! Every function is generic over `SqliteExecutor`, so the same statement runs
//! against the pool or inside an open transaction (`&mut *tx`).

pub mod samples;
pub mod tags;
