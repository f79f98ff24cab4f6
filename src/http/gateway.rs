//! Request gateway: one network attempt per call.
//!
//! # Responsibilities
//! - Build the URL from origin + relative path
//! - Inject the bearer credential and JSON content type
//! - Enforce the request deadline (send + body read)
//! - Classify the outcome into an `Envelope`
//! - Escalate HTTP 401 to a session expiry
//!
//! # Design Decisions
//! - Never returns `Err`; every failure becomes an envelope
//! - No retries at this layer

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::FleetConfig;
use crate::http::envelope::{Envelope, Failure};
use crate::http::request::{join_url, ApiRequest, RequestId, X_REQUEST_ID};
use crate::http::Transport;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::session::SessionStore;

/// Errors constructing a gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("HTTP client build failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP gateway bound to one origin.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    origin: Url,
    timeout: Duration,
    session: SessionStore,
}

impl Gateway {
    /// Create a gateway for `base_url`.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: SessionStore,
    ) -> Result<Self, GatewayError> {
        let origin = Url::parse(base_url).map_err(|e| GatewayError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            origin,
            timeout,
            session,
        })
    }

    /// Create a gateway from configuration.
    pub fn from_config(config: &FleetConfig, session: SessionStore) -> Result<Self, GatewayError> {
        Self::new(
            &config.api.base_url,
            Duration::from_secs(config.timeouts.request_secs),
            session,
        )
    }

    /// Perform exactly one attempt.
    pub async fn request(&self, request: ApiRequest) -> Envelope<Value> {
        let request_id = RequestId::new();
        let url = join_url(&self.origin, &request.path);
        let endpoint = request.metric_label().to_string();

        let mut builder = self
            .client
            .request(request.method.into(), url.clone())
            .header(X_REQUEST_ID, request_id.to_string());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = self.session.token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if !request.method.is_read() && !request.has_header(CONTENT_TYPE.as_str()) {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            match serde_json::to_vec(body) {
                Ok(bytes) => builder = builder.body(bytes),
                Err(e) => return Envelope::fail(Failure::Protocol(e.to_string())),
            }
        }

        tracing::debug!(
            request_id = %request_id,
            method = request.method.as_str(),
            url = %url,
            "Sending request"
        );

        let outcome = with_deadline(self.timeout, async {
            let response = builder.send().await.map_err(classify_transport_error)?;
            let status = response.status();
            let bytes = response.bytes().await.map_err(classify_transport_error)?;
            Ok::<_, Failure>((status, bytes))
        })
        .await;

        let envelope = match outcome {
            Err(_) => Envelope::fail(Failure::Timeout {
                ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Ok(Err(failure)) => Envelope::fail(failure),
            Ok(Ok((status, bytes))) => self.classify_response(status, &bytes),
        };

        match envelope.failure() {
            None => {
                metrics::record_request(&endpoint, "success");
                tracing::debug!(request_id = %request_id, url = %url, "Request succeeded");
            }
            Some(failure) => {
                metrics::record_request(&endpoint, outcome_label(failure));
                tracing::warn!(
                    request_id = %request_id,
                    url = %url,
                    error = %failure,
                    "Request failed"
                );
            }
        }

        envelope
    }

    fn classify_response(&self, status: StatusCode, bytes: &[u8]) -> Envelope<Value> {
        if !status.is_success() {
            let failure = Failure::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            };
            if failure.is_unauthorized() {
                self.session.expire();
            }
            return Envelope::fail(failure);
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Envelope::ok(Value::Null);
        }

        match serde_json::from_slice(bytes) {
            Ok(value) => Envelope::ok(value),
            Err(e) => Envelope::fail(Failure::Protocol(e.to_string())),
        }
    }
}

impl Transport for Gateway {
    async fn send(&self, request: ApiRequest) -> Envelope<Value> {
        self.request(request).await
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("origin", &self.origin.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn classify_transport_error(e: reqwest::Error) -> Failure {
    if e.is_decode() || e.is_body() {
        Failure::Protocol(e.to_string())
    } else {
        Failure::Network(e.to_string())
    }
}

fn outcome_label(failure: &Failure) -> &'static str {
    match failure {
        Failure::Timeout { .. } => "timeout",
        Failure::Network(_) => "network",
        Failure::Http { status, .. } if *status >= 500 => "http_5xx",
        Failure::Http { .. } => "http_4xx",
        Failure::Protocol(_) => "protocol",
        Failure::Exhausted(_) | Failure::UnknownResource(_) => "other",
    }
}
