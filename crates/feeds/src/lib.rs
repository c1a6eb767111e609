//! Ingestion layer for the Pendle v2 API.
//!
//! This crate provides:
//! - `PendleClient` - paginated, deduplicating REST client with retry/backoff
//! - `MarketSource` - the trait seam the orchestrator consumes, so tests can
//!   substitute synthetic upstreams

pub mod client;
pub mod error;
pub mod source;

pub use client::PendleClient;
pub use error::UpstreamError;
pub use source::MarketSource;
