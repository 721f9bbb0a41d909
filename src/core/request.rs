//! Inbound HTTP request capture
//!
//! [`RequestSnapshot`] is what an entry stores under the `http_request` field;
//! credentials are scrubbed at capture time. [`RequestProjection`] is the
//! compact, uniformly shaped form shipped to remote sinks.

use super::redact::{Redactor, FILTERED};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// Request bodies longer than this are truncated in projections
pub const MAX_PROJECTED_BODY: usize = 1000;

/// A captured request with sensitive headers already filtered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub path: String,
    pub query: String,
    pub proto: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: String,
    #[serde(skip)]
    pub body: Vec<u8>,
    pub content_length: Option<u64>,
    pub host: String,
    pub remote_addr: Option<String>,
}

impl RequestSnapshot {
    /// Capture a request. The remote address is read from a `SocketAddr`
    /// request extension when the server put one there.
    pub fn capture<B: AsRef<[u8]>>(req: &http::Request<B>, redactor: &Redactor) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in req.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let cookies = headers.get("cookie").cloned().unwrap_or_default();
        let host = headers
            .get("host")
            .cloned()
            .or_else(|| req.uri().authority().map(|a| a.to_string()))
            .unwrap_or_default();
        let content_length = headers
            .get("content-length")
            .and_then(|v| v.trim().parse().ok());

        let mut snapshot = Self {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().unwrap_or_default().to_string(),
            proto: format!("{:?}", req.version()),
            headers,
            cookies,
            body: req.body().as_ref().to_vec(),
            content_length,
            host,
            remote_addr: req.extensions().get::<SocketAddr>().map(|a| a.to_string()),
        };
        snapshot.filter_credentials(redactor);
        snapshot
    }

    fn filter_credentials(&mut self, redactor: &Redactor) {
        for (name, value) in self.headers.iter_mut() {
            match name.to_lowercase().as_str() {
                "cookie" => *value = redactor.filter_cookie(value),
                "authorization" => *value = FILTERED.to_string(),
                _ => {}
            }
        }
        self.cookies = redactor.filter_cookie(&self.cookies);
    }

    /// Apply a redactor to every textual part of the request
    pub fn redact(&mut self, redactor: &Redactor) {
        self.filter_credentials(redactor);
        for value in self.headers.values_mut() {
            *value = redactor.redact(value).into_owned();
        }
        self.query = redactor.redact(&self.query).into_owned();
        let body = match std::str::from_utf8(&self.body) {
            Ok(text) => match redactor.redact(text) {
                Cow::Owned(redacted) => Some(redacted),
                Cow::Borrowed(_) => None,
            },
            Err(_) => None,
        };
        if let Some(body) = body {
            self.body = body.into_bytes();
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        let headers: serde_json::Map<String, serde_json::Value> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::json!({
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "proto": self.proto,
            "headers": headers,
            "cookies": self.cookies,
            "content_length": self.content_length,
            "host": self.host,
            "remote_addr": self.remote_addr,
        })
    }
}

/// Compact request shape for remote indexes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestProjection {
    pub method: String,
    pub path: String,
    pub query_string: BTreeMap<String, Vec<String>>,
    pub proto: String,
    pub header: BTreeMap<String, String>,
    pub body: String,
    pub content_length: Option<u64>,
    pub host: String,
    pub remote_addr: Option<String>,
}

impl RequestProjection {
    pub fn from_snapshot(req: &RequestSnapshot) -> Self {
        Self {
            method: req.method.clone(),
            path: req.path.clone(),
            query_string: parse_query(&req.query),
            proto: req.proto.clone(),
            header: req.headers.clone(),
            body: project_body(&req.body),
            content_length: req.content_length,
            host: req.host.clone(),
            remote_addr: req.remote_addr.clone(),
        }
    }
}

fn parse_query(query: &str) -> BTreeMap<String, Vec<String>> {
    let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        values.entry(key.to_string()).or_default().push(value.to_string());
    }
    values
}

fn project_body(body: &[u8]) -> String {
    let truncated = &body[..body.len().min(MAX_PROJECTED_BODY)];
    if truncated.contains(&0) {
        "<binary>".to_string()
    } else {
        String::from_utf8_lossy(truncated).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> http::Request<Vec<u8>> {
        let mut req = http::Request::builder()
            .method("POST")
            .uri("https://api.example.com/v1/tasks?page=2&tag=a&tag=b")
            .header("Host", "api.example.com")
            .header("Authorization", "Bearer abc")
            .header("Cookie", "session=1; password=hunter2")
            .header("Accept", "text/plain")
            .header("Accept", "application/json")
            .body(b"{\"title\":\"x\"}".to_vec())
            .unwrap();
        req.extensions_mut()
            .insert("10.0.0.7:5123".parse::<SocketAddr>().unwrap());
        req
    }

    #[test]
    fn test_capture_filters_credentials() {
        let snapshot = RequestSnapshot::capture(&request(), &Redactor::default());

        assert_eq!(snapshot.method, "POST");
        assert_eq!(snapshot.path, "/v1/tasks");
        assert_eq!(snapshot.host, "api.example.com");
        assert_eq!(snapshot.remote_addr.as_deref(), Some("10.0.0.7:5123"));
        assert_eq!(snapshot.headers["authorization"], FILTERED);
        assert_eq!(snapshot.headers["cookie"], "session=1; password=[FILTERED]");
        assert_eq!(snapshot.cookies, "session=1; password=[FILTERED]");
        assert_eq!(snapshot.headers["accept"], "text/plain, application/json");
    }

    #[test]
    fn test_projection_parses_query_and_truncates_body() {
        let mut snapshot = RequestSnapshot::capture(&request(), &Redactor::default());
        snapshot.body = vec![b'a'; MAX_PROJECTED_BODY + 50];

        let projection = RequestProjection::from_snapshot(&snapshot);
        assert_eq!(projection.query_string["tag"], vec!["a", "b"]);
        assert_eq!(projection.query_string["page"], vec!["2"]);
        assert_eq!(projection.body.len(), MAX_PROJECTED_BODY);
    }

    #[test]
    fn test_projection_hides_binary_body() {
        let mut snapshot = RequestSnapshot::capture(&request(), &Redactor::default());
        snapshot.body = vec![0x89, b'P', b'N', b'G', 0, 1];
        assert_eq!(RequestProjection::from_snapshot(&snapshot).body, "<binary>");
    }
}
