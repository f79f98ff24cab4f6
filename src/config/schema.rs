//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the fleet data-access layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FleetConfig {
    /// REST backend origin.
    pub api: ApiConfig,

    /// Real-time channel settings.
    pub realtime: RealtimeConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-resource circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Aggregate result cache settings.
    pub cache: CacheConfig,

    /// Pagination aggregation settings.
    pub pagination: PaginationConfig,

    /// Credential persistence.
    pub session: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Logical resources and the physical endpoints serving them.
    pub resources: Vec<ResourceConfig>,
}

/// REST backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base origin, optionally carrying a base path (e.g. "http://host/api").
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
        }
    }
}

/// Real-time channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// WebSocket origin (e.g. "ws://localhost:8080/ws").
    pub url: String,

    /// Reconnect attempts after a drop before giving up.
    pub max_reconnect_attempts: u32,

    /// Back-off unit in milliseconds; attempt N waits N units.
    pub reconnect_delay_ms: u64,

    /// Channels subscribed on every connect regardless of registrations.
    pub standing_channels: Vec<String>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
            standing_channels: vec![
                "truck_updates".to_string(),
                "alerts".to_string(),
            ],
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (send + body read) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// How long a tripped primary endpoint is skipped, in seconds.
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { cooldown_secs: 300 }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

/// Pagination configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Default page size when a resource does not set its own.
    pub page_size: u32,

    /// Hard stop for a single aggregation.
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 1000,
        }
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session file; `None` keeps the credential in memory only.
    pub path: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: Some(".fleet-session.json".to_string()),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A logical resource served by a primary endpoint and ordered fallbacks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceConfig {
    /// Resource name used by callers (e.g. "trucks").
    pub name: String,

    /// Page size override for this resource.
    #[serde(default)]
    pub page_size: Option<u32>,

    /// Preferred endpoint, guarded by the circuit breaker.
    pub primary: EndpointConfig,

    /// Alternatives tried in declared order.
    #[serde(default)]
    pub fallbacks: Vec<EndpointConfig>,
}

/// A physical endpoint and the mapping of its response body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Path relative to the API origin.
    pub path: String,

    /// How to read the response body.
    #[serde(default)]
    pub mapping: ResponseMapping,
}

/// Versioned response shapes understood by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseMapping {
    /// `{ "data": [...], "pagination": { ... } }`
    #[default]
    PaginatedV1,
    /// A bare top-level array.
    ArrayV1,
    /// `{ "<field>": [...] }`, unpaginated.
    KeyedV1 { field: String },
}

impl FleetConfig {
    /// Look up a resource definition by name.
    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.name == name)
    }
}
