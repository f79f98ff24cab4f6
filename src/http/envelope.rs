//! The uniform response envelope.
//!
//! Every network-facing call in the crate answers with an `Envelope`.
//! Construction goes through `ok`, `fail` and `offline` so that a successful
//! envelope never carries an error and a failed one never carries data,
//! except for the offline fallback's empty collection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified failure of a single call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// Client-side deadline fired before the response completed.
    #[error("timeout after {ms}ms")]
    Timeout { ms: u64 },

    /// No HTTP response at all (DNS, refused connection, reset).
    #[error("network error: {0}")]
    Network(String),

    /// Backend answered with a non-2xx status.
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    /// Response arrived but its body could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Every endpoint for a resource failed.
    #[error("all endpoints failed for resource '{0}'")]
    Exhausted(String),

    /// The resource name is not configured.
    #[error("unknown resource '{0}'")]
    UnknownResource(String),
}

impl Failure {
    /// 5xx responses: the endpoint itself is broken.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Failure::Http { status, .. } if *status >= 500)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Failure::Http { status: 401, .. })
    }

    /// Whether the failure means the backend could not be reached.
    pub fn is_offline(&self) -> bool {
        matches!(
            self,
            Failure::Timeout { .. } | Failure::Network(_) | Failure::Exhausted(_)
        )
    }
}

/// `{ success, data, error, online }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    online: bool,
    #[serde(skip)]
    failure: Option<Failure>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            online: true,
            failure: None,
        }
    }

    pub fn fail(failure: Failure) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(failure.to_string()),
            online: !failure.is_offline(),
            failure: Some(failure),
        }
    }

    /// Failure that still carries a benign empty collection for rendering.
    pub fn offline(empty: T, failure: Failure) -> Self {
        Self {
            success: false,
            data: Some(empty),
            error: Some(failure.to_string()),
            online: false,
            failure: Some(failure),
        }
    }

    /// Flag a result as served while the backend was (partly) unreachable.
    pub fn mark_offline(mut self) -> Self {
        self.online = false;
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Typed failure; `None` for successes and for envelopes read back from JSON.
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Re-wrap the payload, keeping status, error and online flag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            online: self.online,
            failure: self.failure,
        }
    }

    /// Check the success/error/data invariant.
    pub fn is_consistent(&self) -> bool {
        if self.success {
            self.error.is_none() && self.failure.is_none()
        } else {
            self.error.is_some() && (self.data.is_none() || !self.online)
        }
    }
}
