//! HTTP access subsystem.
//!
//! # Data Flow
//! ```text
//! ApiRequest (request.rs)
//!     → gateway.rs (URL join, auth header, deadline)
//!     → reqwest
//!     → envelope.rs (classify status / body into Envelope)
//! ```
//!
//! The `Transport` trait is the seam between the resolver and the network;
//! `Gateway` is the production implementation.

pub mod envelope;
pub mod gateway;
pub mod request;

use serde_json::Value;
use std::future::Future;

pub use envelope::{Envelope, Failure};
pub use gateway::{Gateway, GatewayError};
pub use request::{ApiRequest, Method, RequestId, X_REQUEST_ID};

/// Something that performs one request attempt and answers with an envelope.
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> impl Future<Output = Envelope<Value>> + Send;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn send(&self, request: ApiRequest) -> impl Future<Output = Envelope<Value>> + Send {
        (**self).send(request)
    }
}
