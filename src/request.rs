//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;

use crate::context::Context;

/// An incoming HTTP request plus its request-scoped [`Context`].
///
/// Requests are moved through the handler chain by value. Middleware that
/// wants to add state derives a new context and hands on
/// `req.with_context(ctx)`; it never edits the context in place.
pub struct Request {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    params: HashMap<String, String>,
    context: Context,
}

impl Request {
    /// A request with no headers, no body and an empty context.
    ///
    /// The server builds requests from the wire; this constructor exists for
    /// tests and for driving a handler chain without a socket.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            context: Context::new(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let headers = parts.headers.iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            headers,
            body,
            params: HashMap::new(),
            context: Context::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn context(&self) -> &Context { &self.context }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Replaces the request's context, typically with one layered on top of
    /// [`context`](Request::context).
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{self, USER_ID_KEY};

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::GET, "/").with_header("X-Auth-Subject", "alice");
        assert_eq!(req.header("x-auth-subject"), Some("alice"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn from_parts_keeps_path_without_query() {
        let (parts, ()) = http::Request::builder()
            .method(Method::POST)
            .uri("/api/data?page=2")
            .header("x-request-id", "abc")
            .body(())
            .unwrap()
            .into_parts();
        let req = Request::from_parts(parts, Bytes::from_static(b"{}"));

        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/api/data");
        assert_eq!(req.header("X-Request-Id"), Some("abc"));
        assert_eq!(req.headers(), [("x-request-id".to_owned(), "abc".to_owned())]);
        assert_eq!(req.body(), b"{}");
        assert_eq!(context::request_id(req.context()), None);
    }

    #[test]
    fn with_context_replaces_context() {
        let req = Request::new(Method::GET, "/");
        let ctx = req.context().with_value(USER_ID_KEY, "alice".to_owned());
        let req = req.with_context(ctx);
        assert_eq!(context::user_id(req.context()), Some("alice"));
    }
}
