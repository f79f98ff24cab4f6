//! Circuit breaker for primary endpoints.
//!
//! # States
//! - Closed: primary endpoint is attempted first
//! - Open: primary endpoint is skipped until the cool-down elapses
//!
//! # State Transitions
//! ```text
//! Closed → Open: primary endpoint answers HTTP 5xx
//! Open → Closed: cool-down elapsed (time-based only)
//! ```
//!
//! # Design Decisions
//! - Per-resource breaker (not global)
//! - No half-open state; a successful recovery probe does not close early
//! - A trip never shortens an existing open window

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::observability::metrics;

/// Observable breaker state for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open { remaining: Duration },
}

/// Breaker store keyed by logical resource name.
#[derive(Debug)]
pub struct CircuitBreakers {
    open_until: DashMap<String, Instant>,
    cooldown: Duration,
}

impl CircuitBreakers {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            open_until: DashMap::new(),
            cooldown,
        }
    }

    /// Remaining cool-down if the breaker for `resource` is open.
    pub fn remaining(&self, resource: &str) -> Option<Duration> {
        let now = Instant::now();
        let until = self.open_until.get(resource).map(|r| *r.value())?;
        if until > now {
            return Some(until - now);
        }
        // Expired: logically closed, drop the record
        self.open_until.remove_if(resource, |_, u| *u <= now);
        None
    }

    pub fn is_open(&self, resource: &str) -> bool {
        self.remaining(resource).is_some()
    }

    pub fn state(&self, resource: &str) -> CircuitState {
        match self.remaining(resource) {
            Some(remaining) => CircuitState::Open { remaining },
            None => CircuitState::Closed,
        }
    }

    /// Open the breaker for `resource` for one cool-down from now.
    pub fn trip(&self, resource: &str) {
        let until = Instant::now() + self.cooldown;
        self.open_until
            .entry(resource.to_string())
            .and_modify(|u| {
                if *u < until {
                    *u = until;
                }
            })
            .or_insert(until);

        metrics::record_breaker_trip(resource);
        tracing::warn!(
            resource = %resource,
            cooldown_secs = self.cooldown.as_secs(),
            "Circuit breaker opened for primary endpoint"
        );
    }

    /// Resources whose breaker is currently open, with remaining cool-down.
    pub fn open_resources(&self) -> Vec<(String, Duration)> {
        let now = Instant::now();
        self.open_until
            .iter()
            .filter(|r| *r.value() > now)
            .map(|r| (r.key().clone(), *r.value() - now))
            .collect()
    }
}
