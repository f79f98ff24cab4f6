//! Pagination aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! (resource, params, page_size)
//!     → aggregator.rs: page 1, 2, ... via Resolver (sequential)
//!     → stop on last declared page, failure, or max_pages
//!     → Envelope<Page> with a synthesized single-page summary
//! ```

pub mod aggregator;

pub use aggregator::{aggregate, Aggregation};
