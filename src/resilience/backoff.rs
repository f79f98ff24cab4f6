//! Linear reconnect backoff.

use std::time::Duration;

/// Delay before reconnect attempt `attempt` (1-based): `unit × attempt`.
pub fn linear_backoff(attempt: u32, unit_ms: u64) -> Duration {
    Duration::from_millis(unit_ms.saturating_mul(u64::from(attempt)))
}
