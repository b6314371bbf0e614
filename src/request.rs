// Request descriptors
// Immutable description of one outgoing API call

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

/// One outgoing API call: method, relative path, headers, query, body.
///
/// Descriptors are immutable once built. A retry never mutates the
/// original in place; the pipeline derives a fresh descriptor through
/// [`into_retry`](Self::into_retry), which marks it so no request is
/// ever retried twice. The `id` survives the derivation so both attempts
/// correlate in logs.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Value>,
    is_refresh_call: bool,
    retried: bool,
    id: Uuid,
}

impl RequestDescriptor {
    /// Build a descriptor for an arbitrary method and relative path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            is_refresh_call: false,
            retried: false,
            id: Uuid::new_v4(),
        }
    }

    /// GET request to `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request to `path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// PUT request to `path`.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// DELETE request to `path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set an additional header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Build the dedicated refresh-endpoint call. Refresh calls are never
    /// credentialed and never re-intercepted on auth failure.
    pub(crate) fn refresh_call(path: impl Into<String>, body: Value) -> Self {
        let mut descriptor = Self::new(Method::POST, path);
        descriptor.body = Some(body);
        descriptor.is_refresh_call = true;
        descriptor
    }

    /// Derive the retry descriptor: same call, `retried` set. At most one
    /// retry is ever attempted per logical request.
    pub(crate) fn into_retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub(crate) fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn is_refresh_call(&self) -> bool {
        self.is_refresh_call
    }

    pub fn retried(&self) -> bool {
        self.retried
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}
