//! Core operations: registry, merge, generation, query

pub mod batched_writer;
pub mod csv_import;
pub mod feed_loader;
pub mod generator;
pub mod merger;
pub mod query;
pub mod tag_registry;
