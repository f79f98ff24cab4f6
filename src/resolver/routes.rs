//! Resource route table.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) lookup by resource name
//! - Explicit miss rather than silent default

use std::collections::HashMap;

use crate::config::ResourceConfig;

/// Map of resource name → primary and fallback endpoints.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, ResourceConfig>,
}

impl RouteTable {
    /// Build from configuration. A later duplicate name replaces the earlier one.
    pub fn from_config(resources: &[ResourceConfig]) -> Self {
        let mut routes = HashMap::new();
        for resource in resources {
            if routes.insert(resource.name.clone(), resource.clone()).is_some() {
                tracing::warn!(resource = %resource.name, "Duplicate resource definition replaced");
            }
        }
        Self { routes }
    }

    pub fn get(&self, resource: &str) -> Option<&ResourceConfig> {
        self.routes.get(resource)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
