//! Page-by-page aggregation of a complete collection.
//!
//! # Responsibilities
//! - Walk pages 1..N through the resolver, strictly in order
//! - Concatenate items and synthesize a single-page pagination summary
//! - Keep whatever was accumulated when a page fails
//!
//! # Design Decisions
//! - A failed first page yields `success: true` with an empty collection
//! - `complete` tells the caller whether every page arrived (cache gate)

use serde_json::{Map, Value};

use crate::http::{Envelope, Transport};
use crate::resolver::{Page, Pagination, Resolver};

/// Result of one aggregation.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub envelope: Envelope<Page>,
    /// Every page up to the declared last one was fetched successfully.
    pub complete: bool,
    /// Resolver calls made.
    pub pages_fetched: u32,
}

/// Transient cursor, local to one aggregation.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    page: u32,
    has_more: bool,
}

/// Fetch every page of `resource`.
pub async fn aggregate<T: Transport>(
    resolver: &Resolver<T>,
    resource: &str,
    params: &Value,
    page_size: u32,
    max_pages: u32,
) -> Aggregation {
    let mut items = Vec::new();
    let mut cursor = Cursor { page: 1, has_more: true };
    let mut complete = true;
    let mut online = true;
    let mut pages_fetched = 0;

    while cursor.has_more {
        let envelope = resolver
            .resolve(resource, &with_cursor(params, cursor.page, page_size))
            .await;
        pages_fetched += 1;

        if !envelope.is_success() {
            tracing::warn!(
                resource = %resource,
                page = cursor.page,
                accumulated = items.len(),
                error = envelope.error().unwrap_or_default(),
                "Page fetch failed, returning accumulated items"
            );
            complete = false;
            online = envelope.is_online();
            break;
        }

        let page = envelope.into_data().unwrap_or_default();
        cursor.has_more = page.has_more_after(cursor.page);
        items.extend(page.items);

        if cursor.has_more {
            if cursor.page >= max_pages {
                tracing::warn!(resource = %resource, max_pages, "Page limit reached, truncating");
                complete = false;
                break;
            }
            cursor.page += 1;
        }
    }

    tracing::debug!(
        resource = %resource,
        pages = pages_fetched,
        items = items.len(),
        complete,
        "Aggregation finished"
    );

    let count = items.len();
    let summary = Pagination {
        total: count as u64,
        total_pages: 1,
        current_page: 1,
        per_page: u32::try_from(count).unwrap_or(u32::MAX),
    };
    let mut envelope = Envelope::ok(Page {
        items,
        pagination: Some(summary),
    });
    if !online {
        envelope = envelope.mark_offline();
    }

    Aggregation {
        envelope,
        complete,
        pages_fetched,
    }
}

/// Caller params with `page` and `limit` set.
fn with_cursor(params: &Value, page: u32, limit: u32) -> Value {
    let mut map = match params {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    map.insert("page".to_string(), Value::from(page));
    map.insert("limit".to_string(), Value::from(limit));
    Value::Object(map)
}
