//! Aggregate result caching.
//!
//! # Responsibilities
//! - Memoize aggregate fetches under (method, params) for a fixed window
//! - Treat expired entries as absent without purging them on read
//! - Caller-driven invalidation after mutations
//!
//! # Design Decisions
//! - DashMap shared via Arc; clones of `TtlCache` see the same entries
//! - No background sweep; `purge_expired` exists for explicit housekeeping

pub mod ttl;

pub use ttl::{CacheKey, TtlCache};
