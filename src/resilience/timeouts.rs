//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap outbound calls with a deadline
//! - Cancel the in-flight future cleanly on expiry (it is dropped)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;
use tokio::time::{error::Elapsed, timeout};

/// Run `fut` with a deadline. On expiry the future is dropped and `Elapsed` returned.
pub async fn with_deadline<F: Future>(deadline: Duration, fut: F) -> Result<F::Output, Elapsed> {
    timeout(deadline, fut).await
}
