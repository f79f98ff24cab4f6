//! Resilient data access and real-time sync for a fleet dashboard.
//!
//! # Architecture Overview
//!
//! ```text
//!   fetch(resource, params)
//!        │
//!        ▼
//!   ┌──────────┐   miss   ┌─────────────┐  page N  ┌──────────┐  attempt  ┌─────────┐
//!   │  cache   │─────────▶│ pagination  │─────────▶│ resolver │──────────▶│  http   │──▶ REST
//!   │  (TTL)   │◀─────────│ aggregator  │◀─────────│ +breaker │◀──────────│ gateway │
//!   └──────────┘ complete └─────────────┘          └──────────┘  Envelope └─────────┘
//!                                                                              │
//!                                                                     session (bearer)
//!
//!   realtime::RealtimeClient ◀──── WebSocket frames ────▶ server
//! ```

// Request/response path
pub mod cache;
pub mod client;
pub mod http;
pub mod pagination;
pub mod resolver;

// Push path
pub mod realtime;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ClientError, FleetClient};
pub use config::FleetConfig;
pub use http::{Envelope, Failure, Gateway};
pub use realtime::{ConnectionState, RealtimeClient};
pub use session::SessionStore;
