//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FleetConfig (validated, immutable)
//!     → handed to FleetClient / RealtimeClient at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::FleetConfig;
pub use schema::{
    ApiConfig, CacheConfig, CircuitBreakerConfig, EndpointConfig, ObservabilityConfig,
    PaginationConfig, RealtimeConfig, ResourceConfig, ResponseMapping, SessionConfig,
    TimeoutConfig,
};
