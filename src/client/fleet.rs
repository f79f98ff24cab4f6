//! Composition root for the request/response side.
//!
//! # Responsibilities
//! - Own the gateway, resolver, breaker store, cache and session
//! - Serve `fetch` through cache → aggregator → resolver → gateway
//! - Run create/update/delete against a resource's primary endpoint and
//!   invalidate that resource's cache entries afterwards

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CacheKey, TtlCache};
use crate::config::{FleetConfig, PaginationConfig};
use crate::http::{ApiRequest, Envelope, Failure, Gateway, GatewayError, Method, Transport};
use crate::pagination::aggregate;
use crate::resilience::CircuitBreakers;
use crate::resolver::{Page, Resolver, RouteTable};
use crate::session::SessionStore;

/// Errors constructing a client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("failed to load session: {0}")]
    Session(#[from] std::io::Error),
}

/// Fleet data-access client.
pub struct FleetClient<T = Gateway> {
    resolver: Resolver<T>,
    cache: TtlCache,
    pagination: PaginationConfig,
    session: SessionStore,
}

impl FleetClient<Gateway> {
    /// Build the production stack from configuration.
    pub fn from_config(config: &FleetConfig) -> Result<Self, ClientError> {
        let session = match &config.session.path {
            Some(path) => SessionStore::load_from_file(Path::new(path))?,
            None => SessionStore::default(),
        };
        let gateway = Gateway::from_config(config, session.clone())?;
        Ok(Self::with_transport(gateway, config, session))
    }
}

impl<T: Transport> FleetClient<T> {
    /// Build around any transport, with fresh breaker and cache state.
    pub fn with_transport(transport: T, config: &FleetConfig, session: SessionStore) -> Self {
        let breakers = Arc::new(CircuitBreakers::new(Duration::from_secs(
            config.circuit_breaker.cooldown_secs,
        )));
        let resolver = Resolver::new(
            transport,
            RouteTable::from_config(&config.resources),
            breakers,
        );

        tracing::info!(
            resources = resolver.routes().len(),
            cache_ttl_secs = config.cache.ttl_secs,
            cooldown_secs = config.circuit_breaker.cooldown_secs,
            "Fleet client initialized"
        );

        Self {
            resolver,
            cache: TtlCache::new(Duration::from_secs(config.cache.ttl_secs)),
            pagination: config.pagination.clone(),
            session,
        }
    }

    /// Complete collection for `resource`, served from cache while fresh.
    pub async fn fetch(&self, resource: &str, params: &Value) -> Envelope<Page> {
        let Some(route) = self.resolver.routes().get(resource) else {
            return Envelope::fail(Failure::UnknownResource(resource.to_string()));
        };

        let key = CacheKey::new(resource, params);
        if let Some(cached) = self.cache.get(&key) {
            match serde_json::from_value::<Page>(cached) {
                Ok(page) => {
                    tracing::debug!(resource = %resource, "Served from cache");
                    return Envelope::ok(page);
                }
                Err(e) => {
                    tracing::warn!(resource = %resource, error = %e, "Dropping unreadable cache entry");
                    self.cache.invalidate(&key);
                }
            }
        }

        let page_size = route.page_size.unwrap_or(self.pagination.page_size);
        let result = aggregate(
            &self.resolver,
            resource,
            params,
            page_size,
            self.pagination.max_pages,
        )
        .await;

        if result.complete {
            if let Some(Ok(value)) = result.envelope.data().map(serde_json::to_value) {
                self.cache.set(key, value);
            }
        }
        result.envelope
    }

    /// A single page, bypassing cache and aggregation.
    pub async fn fetch_page(&self, resource: &str, params: &Value) -> Envelope<Page> {
        self.resolver.resolve(resource, params).await
    }

    /// Drop the cached entry for `(resource, params)`, or every entry for
    /// `resource` when `params` is `None`.
    pub fn invalidate(&self, resource: &str, params: Option<&Value>) {
        match params {
            Some(params) => self.cache.invalidate(&CacheKey::new(resource, params)),
            None => self.cache.invalidate_method(resource),
        }
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// POST `body` to the resource's primary endpoint.
    pub async fn create(&self, resource: &str, body: Value) -> Envelope<Value> {
        self.mutate(resource, Method::Post, None, Some(body)).await
    }

    /// PUT `body` to `<primary>/<id>`.
    pub async fn update(&self, resource: &str, id: &str, body: Value) -> Envelope<Value> {
        self.mutate(resource, Method::Put, Some(id), Some(body)).await
    }

    /// DELETE `<primary>/<id>`.
    pub async fn delete(&self, resource: &str, id: &str) -> Envelope<Value> {
        self.mutate(resource, Method::Delete, Some(id), None).await
    }

    async fn mutate(
        &self,
        resource: &str,
        method: Method,
        id: Option<&str>,
        body: Option<Value>,
    ) -> Envelope<Value> {
        let Some(route) = self.resolver.routes().get(resource) else {
            return Envelope::fail(Failure::UnknownResource(resource.to_string()));
        };

        let base = route.primary.path.trim_end_matches('/');
        let (path, label) = match id {
            Some(id) => (format!("{}/{}", base, id), format!("{}/{{id}}", base)),
            None => (base.to_string(), base.to_string()),
        };
        let mut request = ApiRequest::new(method, path).with_label(label);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let envelope = self.resolver.transport().send(request).await;
        if envelope.is_success() {
            self.cache.invalidate_method(resource);
            tracing::info!(resource = %resource, method = method.as_str(), "Mutation applied");
        }
        envelope
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub fn breakers(&self) -> &CircuitBreakers {
        self.resolver.breakers()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn transport(&self) -> &T {
        self.resolver.transport()
    }
}
