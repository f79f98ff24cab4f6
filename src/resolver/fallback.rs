//! Endpoint resolution with fallback chain and circuit breaker.
//!
//! # Algorithm (stops at first success)
//! ```text
//! 1. breaker open for resource?  → skip step 2
//! 2. primary                      → 5xx trips the breaker, other failures just continue
//! 3. fallbacks in declared order
//! 4. primary once more (recovery probe, ignores the breaker, never closes it)
//! 5. offline envelope with an empty page
//! ```
//!
//! A 401 from any endpoint ends the chain: the credential is gone, so every
//! further attempt would be rejected too.

use serde_json::Value;
use std::sync::Arc;

use crate::config::{EndpointConfig, ResourceConfig};
use crate::http::{ApiRequest, Envelope, Failure, Transport};
use crate::resilience::CircuitBreakers;
use crate::resolver::mapping::{map_response, Page};
use crate::resolver::routes::RouteTable;

/// Resolves logical resources to the best available physical endpoint.
pub struct Resolver<T> {
    transport: T,
    routes: RouteTable,
    breakers: Arc<CircuitBreakers>,
}

impl<T: Transport> Resolver<T> {
    pub fn new(transport: T, routes: RouteTable, breakers: Arc<CircuitBreakers>) -> Self {
        Self {
            transport,
            routes,
            breakers,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn breakers(&self) -> &CircuitBreakers {
        &self.breakers
    }

    /// Fetch `resource` with `params` from the best available endpoint.
    pub async fn resolve(&self, resource: &str, params: &Value) -> Envelope<Page> {
        let Some(route) = self.routes.get(resource) else {
            tracing::warn!(resource = %resource, "Unknown resource requested");
            return Envelope::fail(Failure::UnknownResource(resource.to_string()));
        };

        match self.breakers.remaining(resource) {
            Some(remaining) => {
                tracing::info!(
                    resource = %resource,
                    remaining_secs = remaining.as_secs(),
                    "Circuit open, skipping primary endpoint"
                );
            }
            None => match self.attempt(route, &route.primary, params).await {
                Ok(page) => return Envelope::ok(page),
                Err(failure) if failure.is_unauthorized() => return Envelope::fail(failure),
                Err(failure) if failure.is_server_error() => self.breakers.trip(resource),
                Err(_) => {}
            },
        }

        for (idx, fallback) in route.fallbacks.iter().enumerate() {
            match self.attempt(route, fallback, params).await {
                Ok(page) => {
                    tracing::info!(
                        resource = %resource,
                        fallback_idx = idx,
                        endpoint = %fallback.path,
                        "Served from fallback endpoint"
                    );
                    return Envelope::ok(page);
                }
                Err(failure) if failure.is_unauthorized() => return Envelope::fail(failure),
                Err(_) => {}
            }
        }

        tracing::debug!(resource = %resource, "Recovery probe against primary endpoint");
        if let Ok(page) = self.attempt(route, &route.primary, params).await {
            return Envelope::ok(page);
        }

        tracing::error!(resource = %resource, "All endpoints failed");
        Envelope::offline(Page::default(), Failure::Exhausted(resource.to_string()))
    }

    async fn attempt(
        &self,
        route: &ResourceConfig,
        endpoint: &EndpointConfig,
        params: &Value,
    ) -> Result<Page, Failure> {
        let request = ApiRequest::get(endpoint.path.clone()).with_params(params);
        let envelope = self.transport.send(request).await;

        let result = if envelope.is_success() {
            let body = envelope.into_data().unwrap_or(Value::Null);
            map_response(&endpoint.mapping, body)
        } else {
            Err(envelope
                .failure()
                .cloned()
                .unwrap_or_else(|| Failure::Network(envelope.error().unwrap_or("unknown").to_string())))
        };

        if let Err(failure) = &result {
            tracing::warn!(
                resource = %route.name,
                endpoint = %endpoint.path,
                error = %failure,
                "Endpoint attempt failed"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{http_error, resource, ScriptedTransport};
    use serde_json::json;
    use std::time::Duration;

    fn resolver(
        transport: Arc<ScriptedTransport>,
        resources: &[ResourceConfig],
    ) -> Resolver<Arc<ScriptedTransport>> {
        Resolver::new(
            transport,
            RouteTable::from_config(resources),
            Arc::new(CircuitBreakers::new(Duration::from_secs(300))),
        )
    }

    #[tokio::test]
    async fn test_primary_success() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Envelope::ok(json!({ "data": [{"id": 1}] }))
        }));
        let resolver = resolver(transport.clone(), &[resource("trucks", &["/alt"])]);

        let env = resolver.resolve("trucks", &json!({})).await;
        assert!(env.is_success());
        assert_eq!(env.data().unwrap().items, vec![json!({"id": 1})]);
        assert_eq!(transport.paths(), vec!["/trucks"]);
    }

    #[tokio::test]
    async fn test_fallback_ordering() {
        let transport = Arc::new(ScriptedTransport::new(|req| match req.path.as_str() {
            "/alt2" => Envelope::ok(json!(["from-alt2"])),
            _ => http_error(502),
        }));
        let resolver = resolver(
            transport.clone(),
            &[resource("trucks", &["/alt1", "/alt2", "/alt3"])],
        );

        let env = resolver.resolve("trucks", &json!({})).await;
        assert_eq!(env.data().unwrap().items, vec![json!("from-alt2")]);
        // Nothing after alt2, no recovery probe
        assert_eq!(transport.paths(), vec!["/trucks", "/alt1", "/alt2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_skips_primary_within_cooldown() {
        let transport = Arc::new(ScriptedTransport::new(|req| match req.path.as_str() {
            "/trucks" => http_error(500),
            _ => Envelope::ok(json!(["alt"])),
        }));
        let resolver = resolver(transport.clone(), &[resource("trucks", &["/alt"])]);

        let env = resolver.resolve("trucks", &json!({})).await;
        assert!(env.is_success());
        assert_eq!(transport.calls_to("/trucks"), 1);
        assert!(resolver.breakers().is_open("trucks"));

        tokio::time::advance(Duration::from_secs(120)).await;
        let env = resolver.resolve("trucks", &json!({})).await;
        assert!(env.is_success());
        assert_eq!(transport.calls_to("/trucks"), 1, "primary must be skipped");
        assert_eq!(transport.calls_to("/alt"), 2);

        tokio::time::advance(Duration::from_secs(181)).await;
        resolver.resolve("trucks", &json!({})).await;
        assert_eq!(transport.calls_to("/trucks"), 2, "primary retried after cool-down");
    }

    #[tokio::test]
    async fn test_breaker_is_per_resource() {
        let transport = Arc::new(ScriptedTransport::new(|req| match req.path.as_str() {
            "/trucks" => http_error(503),
            "/devices" => Envelope::ok(json!({ "data": [] })),
            _ => Envelope::ok(json!([])),
        }));
        let resolver = resolver(
            transport.clone(),
            &[resource("trucks", &["/alt"]), resource("devices", &[])],
        );

        resolver.resolve("trucks", &json!({})).await;
        resolver.resolve("devices", &json!({})).await;
        assert!(resolver.breakers().is_open("trucks"));
        assert!(!resolver.breakers().is_open("devices"));
    }

    #[tokio::test]
    async fn test_client_errors_do_not_trip() {
        let transport = Arc::new(ScriptedTransport::new(|req| match req.path.as_str() {
            "/trucks" => http_error(404),
            _ => Envelope::ok(json!([])),
        }));
        let resolver = resolver(transport.clone(), &[resource("trucks", &["/alt"])]);

        resolver.resolve("trucks", &json!({})).await;
        assert!(!resolver.breakers().is_open("trucks"));
    }

    #[tokio::test]
    async fn test_unauthorized_ends_chain() {
        let transport = Arc::new(ScriptedTransport::new(|_| http_error(401)));
        let primary_rejects = resolver(transport.clone(), &[resource("trucks", &["/alt", "/alt2"])]);

        let env = primary_rejects.resolve("trucks", &json!({})).await;
        assert!(!env.is_success());
        assert!(env.failure().unwrap().is_unauthorized());
        assert_eq!(transport.paths(), vec!["/trucks"]);
        assert!(!primary_rejects.breakers().is_open("trucks"));

        // A fallback rejecting the credential stops the chain as well
        let transport = Arc::new(ScriptedTransport::new(|req| match req.path.as_str() {
            "/trucks" => http_error(503),
            _ => http_error(401),
        }));
        let fallback_rejects = resolver(transport.clone(), &[resource("trucks", &["/alt", "/alt2"])]);
        fallback_rejects.resolve("trucks", &json!({})).await;
        assert_eq!(transport.paths(), vec!["/trucks", "/alt"]);
    }

    #[tokio::test]
    async fn test_recovery_probe_does_not_close_breaker() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let transport = Arc::new(ScriptedTransport::new(move |req| {
            if req.path != "/trucks" {
                return http_error(500);
            }
            // First primary attempt fails, recovery probe succeeds
            match calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) {
                0 => http_error(500),
                _ => Envelope::ok(json!({ "data": ["probe"] })),
            }
        }));
        let resolver = resolver(transport.clone(), &[resource("trucks", &["/alt"])]);

        let env = resolver.resolve("trucks", &json!({})).await;
        assert_eq!(env.data().unwrap().items, vec![json!("probe")]);
        assert_eq!(transport.paths(), vec!["/trucks", "/alt", "/trucks"]);
        assert!(resolver.breakers().is_open("trucks"));
    }

    #[tokio::test]
    async fn test_exhaustion_returns_offline_empty() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Envelope::fail(Failure::Network("connection refused".into()))
        }));
        let resolver = resolver(transport.clone(), &[resource("trucks", &["/alt"])]);

        let env = resolver.resolve("trucks", &json!({})).await;
        assert!(!env.is_success());
        assert!(!env.is_online());
        assert!(env.is_consistent());
        assert_eq!(env.data(), Some(&Page::default()));
        assert_eq!(transport.total_calls(), 3);
        // Network failures never trip the breaker
        assert!(!resolver.breakers().is_open("trucks"));
    }

    #[tokio::test]
    async fn test_shape_mismatch_falls_back() {
        let transport = Arc::new(ScriptedTransport::new(|req| match req.path.as_str() {
            "/trucks" => Envelope::ok(json!({ "items": [] })),
            _ => Envelope::ok(json!(["ok"])),
        }));
        let resolver = resolver(transport.clone(), &[resource("trucks", &["/alt"])]);

        let env = resolver.resolve("trucks", &json!({})).await;
        assert_eq!(env.data().unwrap().items, vec![json!("ok")]);
        assert!(!resolver.breakers().is_open("trucks"));
    }

    #[tokio::test]
    async fn test_params_forwarded_as_query() {
        let transport = Arc::new(ScriptedTransport::new(|_| Envelope::ok(json!({ "data": [] }))));
        let resolver = resolver(transport.clone(), &[resource("trucks", &[])]);

        resolver.resolve("trucks", &json!({ "status": "active", "page": 2 })).await;
        let call = &transport.calls()[0];
        assert_eq!(call.query_value("status"), Some("active"));
        assert_eq!(call.query_value("page"), Some("2"));
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let transport = Arc::new(ScriptedTransport::new(|_| Envelope::ok(json!([]))));
        let resolver = resolver(transport.clone(), &[]);

        let env = resolver.resolve("cranes", &json!({})).await;
        assert_eq!(env.error(), Some("unknown resource 'cranes'"));
        assert_eq!(transport.total_calls(), 0);
    }
}
