//! Inbound interface for UI collaborators.
//!
//! # Data Flow
//! ```text
//! fetch(resource, params)
//!     → cache (hit returns immediately)
//!     → pagination::aggregate
//!     → resolver (breaker + fallbacks)
//!     → gateway → network
//! ```

pub mod fleet;

pub use fleet::{ClientError, FleetClient};
