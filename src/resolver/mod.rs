//! Endpoint resolution subsystem.
//!
//! # Data Flow
//! ```text
//! (resource, params)
//!     → routes.rs (resource → primary + fallbacks)
//!     → fallback.rs (breaker check, ordered attempts via Transport)
//!     → mapping.rs (endpoint body → canonical Page)
//!     → Envelope<Page>
//! ```
//!
//! # Design Decisions
//! - Breaker state is per resource and lives in a shared `CircuitBreakers`
//! - Each endpoint names its response shape explicitly; no field probing

pub mod fallback;
pub mod mapping;
pub mod routes;

pub use fallback::Resolver;
pub use mapping::{map_response, Page, Pagination};
pub use routes::RouteTable;
