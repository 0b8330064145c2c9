//! Data ingestion module - rate-limited enrichment and geocoding jobs that build the flat company table

pub mod enrich;
pub mod fetch;
pub mod geocode;
pub mod parse;
pub mod types;
pub mod utils;
pub mod write;

pub use types::*;
