//! HTTP API handlers

pub mod config;
pub mod generate;
pub mod health;
pub mod ingest;
pub mod query;
pub mod tags;
pub mod upload;

pub use config::config_routes;
pub use generate::generate_routes;
pub use health::health_routes;
pub use ingest::ingest_routes;
pub use query::query_routes;
pub use tags::tag_routes;
pub use upload::upload_routes;
