//! Handler and Service traits, and type erasure.
//!
//! # Two shapes, one chain
//!
//! Application code writes plain async functions that *return* a response:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }
//! ```
//!
//! Middleware needs something else: a hook that runs *around* the inner
//! handler and can see what it writes. That is [`Service`], which receives
//! the request together with the [`ResponseSink`] to write into.
//!
//! Everything that can sit in the chain implements the sealed [`Handler`]
//! trait, which turns it into a shared `Arc<dyn Service>`:
//!
//! ```text
//! async fn hello(req) -> Response      ← user writes this
//!        ↓ mw.identity(hello)
//! hello.into_service()                 ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))           ← BoxedService
//!        ↓ call(req, sink) at request time
//! hello(req).await.into_response()     ← committed into the sink
//!     .write_to(sink)
//! ```
//!
//! `Router`, [`Identity`](crate::middleware::Identity) and
//! [`Logging`](crate::middleware::Logging) implement `Handler` too, so they
//! nest in any order.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::error;

use crate::context;
use crate::request::Request;
use crate::response::{IntoResponse, Response, ResponseSink};

/// A heap-allocated, type-erased future borrowed for `'a`.
pub type BoxFuture<'a, T = ()> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One step of the handler chain.
///
/// Implement this to write your own middleware. The future may borrow both
/// `self` and the sink; it resolves once the response has been written.
pub trait Service: Send + Sync + 'static {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a>;
}

/// A type-erased service shared across concurrent requests.
pub type BoxedService = Arc<dyn Service>;

/// Implemented for everything that can be routed to or wrapped by middleware.
///
/// Satisfied automatically by any function with the signature
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// and by the framework's own composable types. The trait is sealed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_service(self) -> BoxedService;
}

pub(crate) mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_service(self) -> BoxedService {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a plain async function to [`Service`].
struct FnHandler<F>(F);

impl<F, Fut, R> Service for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        let request_id = context::request_id(req.context()).map(str::to_owned);
        let fut = (self.0)(req);
        Box::pin(async move {
            commit(fut.await.into_response(), res, request_id.as_deref());
        })
    }
}

/// Writes `response` into `sink`, logging instead of failing if the sink
/// refuses the body.
pub(crate) fn commit(response: Response, sink: &mut dyn ResponseSink, request_id: Option<&str>) {
    if let Err(e) = response.write_to(sink) {
        error!(request_id, error = %e, "failed to write response");
    }
}
