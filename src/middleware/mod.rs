//! Middleware layer.
//!
//! Two composable units, both built from one shared [`Middleware`]
//! configuration:
//!
//! - [`Identity`] asks an [`Extractor`] for the caller's [`Claims`] and puts
//!   the subject into the request context. It never rejects a request: if
//!   extraction fails the request carries on anonymously.
//! - [`Logging`] times the request, watches the status through a
//!   [`ResponseObserver`] and emits one `Request completed` event per request.
//!
//! Both make sure the request has a correlation id before calling inward:
//! whichever runs outermost mints it (unless the server already seeded one
//! from an upstream header) and every inner layer reuses it.
//!
//! ```rust,no_run
//! use herald::{Request, Response, Router, Server, context};
//! use herald::middleware::{Middleware, ProxyHeaders};
//! use http::Method;
//!
//! # async fn run() -> Result<(), herald::Error> {
//! let mw = Middleware::new("billing-api").with_extractor(ProxyHeaders::default());
//!
//! let app = Router::new().on(Method::GET, "/invoices", list_invoices);
//!
//! Server::bind("0.0.0.0:3000")
//!     .serve(mw.logging(mw.identity(app)))
//!     .await
//! # }
//!
//! async fn list_invoices(req: Request) -> Response {
//!     let user = context::user_id(req.context()).unwrap_or("anonymous");
//!     Response::text(format!("invoices for {user}"))
//! }
//! ```
//!
//! # Ordering
//!
//! Either order works. With `identity(logging(h))` the logger finds the user
//! id in its own context. With `logging(identity(h))` the logger leaves an
//! identity slot in the context that the inner identity layer fills, so the
//! completion event still names the user. Nested loggers share one slot, and
//! when identity layers nest the innermost one wins, which is the user the
//! handler sees.

mod extract;
mod identity;
mod logging;
mod observer;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::Dispatch;
use uuid::Uuid;

pub use extract::{AuthorizerClaims, Claims, ExtractError, Extractor, ProxyHeaders};
pub use identity::Identity;
pub use logging::Logging;
pub use observer::ResponseObserver;

use crate::context::{self, Context, REQUEST_ID_KEY};
use crate::handler::Handler;
use crate::request::Request;

/// Shared, read-only configuration for the middleware.
///
/// Build one at startup and wrap handlers with [`identity`](Self::identity)
/// and [`logging`](Self::logging). Cloning is cheap; every wrapper holds its
/// own clone.
#[derive(Clone)]
pub struct Middleware {
    app: Arc<str>,
    extractor: Arc<dyn Extractor>,
    dispatch: Option<Dispatch>,
}

impl Middleware {
    /// Configuration for the application named `app`, which every event
    /// carries in its `app` field. Extracts claims with [`AuthorizerClaims`]
    /// and logs to the current default subscriber until told otherwise.
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: Arc::from(app.into()),
            extractor: Arc::new(AuthorizerClaims),
            dispatch: None,
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: impl Extractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Send events to `dispatch` instead of the ambient default subscriber.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    /// Wraps `handler` with identity extraction.
    pub fn identity(&self, handler: impl Handler) -> Identity {
        Identity::new(self.clone(), handler.into_service())
    }

    /// Wraps `handler` with request logging.
    pub fn logging(&self, handler: impl Handler) -> Logging {
        Logging::new(self.clone(), handler.into_service())
    }

    fn emit(&self, event: impl FnOnce()) {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, event),
            None => event(),
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("app", &self.app)
            .field("dispatch", &self.dispatch.is_some())
            .finish_non_exhaustive()
    }
}

/// Returns the request's correlation id, minting and layering a new one if
/// the context has none.
fn resolve_request_id(req: Request) -> (String, Request) {
    if let Some(id) = context::request_id(req.context()) {
        return (id.to_owned(), req);
    }
    let id = Uuid::new_v4().to_string();
    let ctx = req.context().with_value(REQUEST_ID_KEY, id.clone());
    (id, req.with_context(ctx))
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

const IDENTITY_SLOT_KEY: &str = "herald.identity_slot";

/// Cell a [`Logging`] layer leaves in the context so an inner [`Identity`]
/// layer can report the user back out. The last publish wins.
#[derive(Debug, Default)]
struct IdentitySlot(Mutex<Option<String>>);

impl IdentitySlot {
    /// The slot an outer logger already left in `ctx`, or a new one layered
    /// onto it.
    fn attach(ctx: &Context) -> (Arc<Self>, Context) {
        if let Some(slot) = ctx.get::<Arc<Self>>(IDENTITY_SLOT_KEY) {
            return (Arc::clone(slot), ctx.clone());
        }
        let slot = Arc::new(Self::default());
        (Arc::clone(&slot), ctx.with_value(IDENTITY_SLOT_KEY, slot))
    }

    fn publish(&self, user_id: &str) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(user_id.to_owned());
    }

    fn get(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
