//! Test doubles shared by unit tests.

use serde_json::Value;
use std::sync::Mutex;

use crate::config::{EndpointConfig, ResourceConfig, ResponseMapping};
use crate::http::{ApiRequest, Envelope, Failure, Transport};

type Handler = Box<dyn Fn(&ApiRequest) -> Envelope<Value> + Send + Sync>;

/// Transport answering from a closure and recording every call.
pub struct ScriptedTransport {
    handler: Handler,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> Envelope<Value> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.path).collect()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| r.path == path).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Envelope<Value> {
        self.calls.lock().unwrap().push(request.clone());
        (self.handler)(&request)
    }
}

pub fn http_error(status: u16) -> Envelope<Value> {
    Envelope::fail(Failure::Http {
        status,
        reason: "scripted".to_string(),
    })
}

pub fn endpoint(path: &str, mapping: ResponseMapping) -> EndpointConfig {
    EndpointConfig {
        path: path.to_string(),
        mapping,
    }
}

/// `name` served by `/name` (paginated) with array fallbacks at the given paths.
pub fn resource(name: &str, fallbacks: &[&str]) -> ResourceConfig {
    ResourceConfig {
        name: name.to_string(),
        page_size: None,
        primary: endpoint(&format!("/{}", name), ResponseMapping::PaginatedV1),
        fallbacks: fallbacks
            .iter()
            .map(|p| endpoint(p, ResponseMapping::ArrayV1))
            .collect(),
    }
}
