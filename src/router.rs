//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. You register a path, you
//! get a handler. Middleware wraps either single handlers or the whole
//! router; the router does not care which.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::context;
use crate::handler::{self, BoxFuture, BoxedService, Handler, Service};
use crate::request::Request;
use crate::response::{Response, ResponseSink};

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve),
/// optionally wrapped in middleware. Each [`Router::on`] call returns `self`
/// so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedService>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or collides with an existing one.
    /// Routes are registered at startup, so this surfaces as a boot failure.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_service())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedService, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Service for Router {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        let route = self.lookup(req.method(), req.path());
        match route {
            Some((route, params)) => Box::pin(async move {
                route.call(req.with_params(params), res).await;
            }),
            None => {
                let request_id = context::request_id(req.context());
                handler::commit(Response::status(StatusCode::NOT_FOUND), res, request_id);
                Box::pin(std::future::ready(()))
            }
        }
    }
}

impl handler::private::Sealed for Router {}

impl Handler for Router {
    fn into_service(self) -> BoxedService {
        Arc::new(self)
    }
}
