//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (deadline around each gateway call)
//!     → circuit_breaker.rs (per-resource skip of a failing primary)
//!
//! Real-time connection drop:
//!     → backoff.rs (linear delay per reconnect attempt)
//! ```

pub mod backoff;
pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreakers, CircuitState};
