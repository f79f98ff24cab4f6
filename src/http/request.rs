//! Outbound request description.
//!
//! # Responsibilities
//! - Describe one call (method, path, query, body, extra headers)
//! - Join relative paths onto the configured origin
//! - Flatten JSON parameter objects into query pairs
//! - Generate request IDs for log correlation

use serde_json::Value;
use url::Url;
use uuid::Uuid;

/// Header carrying the per-call correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// HTTP methods the gateway issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// GET and HEAD never carry a JSON content type.
    pub fn is_read(self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single call to be performed by a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    /// Route template used as the metrics label (e.g. "/trucks/{id}").
    pub label: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            label: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Append query pairs taken from a JSON object.
    pub fn with_params(mut self, params: &Value) -> Self {
        self.query.extend(query_pairs(params));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label for per-endpoint metrics; the path when no template was given.
    pub fn metric_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.path)
    }

    /// Case-insensitive check for a caller-supplied header.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Look up a query value (first match).
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Flatten a JSON object into query pairs; scalars are stringified, nulls skipped.
///
/// Arrays repeat the key once per element. Non-object params yield nothing.
pub fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Some(map) = params.as_object() else {
        return Vec::new();
    };

    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(s) = scalar_to_string(item) {
                        pairs.push((key.clone(), s));
                    }
                }
            }
            other => {
                if let Some(s) = scalar_to_string(other) {
                    pairs.push((key.clone(), s));
                }
            }
        }
    }
    pairs
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Join a relative path onto the origin, dropping one duplicated base-path prefix.
///
/// With origin `http://host/api`, both `/trucks` and `/api/trucks` resolve to
/// `http://host/api/trucks`. A query embedded in `path` is kept.
pub fn join_url(origin: &Url, path: &str) -> Url {
    let (path, query) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path, None),
    };

    let base_path = origin.path().trim_end_matches('/');
    let mut rel = path;
    if !base_path.is_empty() {
        if rel == base_path {
            rel = "";
        } else if let Some(rest) = rel.strip_prefix(base_path) {
            if rest.starts_with('/') {
                rel = rest;
            }
        }
    }

    let mut url = origin.clone();
    url.set_path(&format!("{}/{}", base_path, rel.trim_start_matches('/')));
    url.set_query(query);
    url
}

/// Unique ID attached to each outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn origin(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_join_strips_duplicate_prefix() {
        let base = origin("http://fleet.local:8080/api");
        assert_eq!(
            join_url(&base, "/trucks").as_str(),
            "http://fleet.local:8080/api/trucks"
        );
        assert_eq!(
            join_url(&base, "/api/trucks").as_str(),
            "http://fleet.local:8080/api/trucks"
        );
        // Only one segment is stripped
        assert_eq!(
            join_url(&base, "/api/api/trucks").as_str(),
            "http://fleet.local:8080/api/api/trucks"
        );
        // A path merely sharing the prefix text is untouched
        assert_eq!(
            join_url(&base, "/apiary").as_str(),
            "http://fleet.local:8080/api/apiary"
        );
    }

    #[test]
    fn test_join_without_base_path() {
        let base = origin("http://fleet.local/");
        assert_eq!(join_url(&base, "trucks").as_str(), "http://fleet.local/trucks");
        assert_eq!(join_url(&base, "/trucks").as_str(), "http://fleet.local/trucks");
    }

    #[test]
    fn test_join_keeps_embedded_query() {
        let base = origin("http://fleet.local/api");
        let url = join_url(&base, "/trucks?status=active");
        assert_eq!(url.path(), "/api/trucks");
        assert_eq!(url.query(), Some("status=active"));
    }

    #[test]
    fn test_query_pairs() {
        let pairs = query_pairs(&json!({
            "page": 2,
            "limit": 50,
            "status": "active",
            "archived": false,
            "site": null,
            "ids": [1, 2]
        }));
        // serde_json objects iterate in key order
        assert_eq!(
            pairs,
            vec![
                ("archived".to_string(), "false".to_string()),
                ("ids".to_string(), "1".to_string()),
                ("ids".to_string(), "2".to_string()),
                ("limit".to_string(), "50".to_string()),
                ("page".to_string(), "2".to_string()),
                ("status".to_string(), "active".to_string()),
            ]
        );
        assert!(query_pairs(&json!("scalar")).is_empty());
    }

    #[test]
    fn test_metric_label_defaults_to_path() {
        let plain = ApiRequest::get("/trucks");
        assert_eq!(plain.metric_label(), "/trucks");

        let templated = ApiRequest::new(Method::Delete, "/trucks/T-9").with_label("/trucks/{id}");
        assert_eq!(templated.metric_label(), "/trucks/{id}");
        assert_eq!(templated.path, "/trucks/T-9");
    }

    #[test]
    fn test_method_classification() {
        assert!(Method::Get.is_read());
        assert!(Method::Head.is_read());
        assert!(!Method::Post.is_read());
        assert!(!Method::Delete.is_read());
    }
}
