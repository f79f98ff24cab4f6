//! Response mapping: raw endpoint JSON → canonical `Page`.
//!
//! Each endpoint declares which versioned shape it serves; anything that does
//! not match its declared shape is a protocol failure for that attempt.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ResponseMapping;
use crate::http::Failure;

/// Pagination metadata as declared by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub total: u64,
    pub total_pages: u32,
    pub current_page: u32,
    pub per_page: u32,
}

/// Canonical shape of one endpoint response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl Page {
    /// Whether the backend declares pages beyond `page`.
    pub fn has_more_after(&self, page: u32) -> bool {
        self.pagination.is_some_and(|p| p.total_pages > page)
    }
}

/// Map a response body according to the endpoint's declared shape.
pub fn map_response(mapping: &ResponseMapping, body: Value) -> Result<Page, Failure> {
    match mapping {
        ResponseMapping::PaginatedV1 => {
            let Value::Object(mut map) = body else {
                return Err(shape_error("paginated_v1", "expected an object"));
            };
            let items = match map.remove("data") {
                Some(Value::Array(items)) => items,
                _ => return Err(shape_error("paginated_v1", "missing 'data' array")),
            };
            let pagination = match map.remove("pagination") {
                None | Some(Value::Null) => None,
                Some(raw) => Some(
                    serde_json::from_value(raw)
                        .map_err(|e| shape_error("paginated_v1", &e.to_string()))?,
                ),
            };
            Ok(Page { items, pagination })
        }
        ResponseMapping::ArrayV1 => match body {
            Value::Array(items) => Ok(Page { items, pagination: None }),
            _ => Err(shape_error("array_v1", "expected an array")),
        },
        ResponseMapping::KeyedV1 { field } => match body {
            Value::Object(mut map) => match map.remove(field) {
                Some(Value::Array(items)) => Ok(Page { items, pagination: None }),
                _ => Err(shape_error("keyed_v1", &format!("missing '{}' array", field))),
            },
            _ => Err(shape_error("keyed_v1", "expected an object")),
        },
    }
}

fn shape_error(mapping: &str, detail: &str) -> Failure {
    Failure::Protocol(format!("{} response: {}", mapping, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paginated() {
        let page = map_response(
            &ResponseMapping::PaginatedV1,
            json!({
                "data": [{"id": 1}, {"id": 2}],
                "pagination": {"total": 7, "total_pages": 4, "current_page": 1, "per_page": 2}
            }),
        )
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more_after(1));
        assert!(!page.has_more_after(4));
    }

    #[test]
    fn test_paginated_without_metadata() {
        let page = map_response(&ResponseMapping::PaginatedV1, json!({ "data": [] })).unwrap();
        assert!(page.pagination.is_none());
        assert!(!page.has_more_after(1));
    }

    #[test]
    fn test_keyed_and_array() {
        let keyed = ResponseMapping::KeyedV1 { field: "trucks".into() };
        let page = map_response(&keyed, json!({ "trucks": [1, 2, 3] })).unwrap();
        assert_eq!(page.items, vec![json!(1), json!(2), json!(3)]);

        let page = map_response(&ResponseMapping::ArrayV1, json!(["a"])).unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_shape_mismatch_is_protocol_failure() {
        let err = map_response(&ResponseMapping::ArrayV1, json!({ "data": [] })).unwrap_err();
        assert!(matches!(err, Failure::Protocol(_)));

        let keyed = ResponseMapping::KeyedV1 { field: "trucks".into() };
        let err = map_response(&keyed, json!({ "vehicles": [] })).unwrap_err();
        assert!(err.to_string().contains("missing 'trucks' array"));
    }
}
