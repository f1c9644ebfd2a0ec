//! # herald
//!
//! A minimal HTTP framework for Rust services behind a reverse proxy, with
//! the two pieces of middleware every such service ends up writing:
//!
//! - **Identity**: ask an [`Extractor`](middleware::Extractor) who the caller
//!   is and put the answer in the request [`Context`].
//! - **Request logging**: one structured `tracing` event per request with
//!   method, path, status, duration, user and correlation id.
//!
//! Neither one gatekeeps. A request with no identity is logged as anonymous
//! and served anyway; rejecting it is the handler's (or the proxy's) call.
//!
//! ## Request-scoped context
//!
//! Every [`Request`] carries an immutable, layered [`Context`]. Middleware
//! adds keys by deriving a new context and passing it inward. Handlers read
//! it with the typed accessors in [`context`]:
//!
//! ```rust
//! use herald::{Request, Response, context};
//!
//! async fn whoami(req: Request) -> Response {
//!     match context::user_id(req.context()) {
//!         Some(user) => Response::text(format!("hello {user}")),
//!         None => Response::text("hello stranger"),
//!     }
//! }
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use herald::{Request, Response, Router, Server};
//! use herald::middleware::{Middleware, ProxyHeaders};
//! use http::Method;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), herald::Error> {
//!     tracing_subscriber::fmt::init();
//!
//!     let mw = Middleware::new("users-api").with_extractor(ProxyHeaders::default());
//!     let app = Router::new().on(Method::GET, "/users/{id}", get_user);
//!
//!     Server::bind("0.0.0.0:3000")
//!         .request_id_header("x-request-id")
//!         .serve(mw.logging(mw.identity(app)))
//!         .await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod context;
pub mod middleware;

pub use context::Context;
pub use error::Error;
pub use handler::{BoxFuture, BoxedService, Handler, Service};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder, ResponseSink};
pub use router::Router;
pub use server::Server;
