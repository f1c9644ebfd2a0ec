//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets every in-flight
//! connection finish, then returns from [`Server::serve`].
//!
//! Each request gets a fresh [`Context`]. If a request-id header is
//! configured and the client (or the proxy in front) sent one, its value is
//! layered in as the correlation id before any middleware runs.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::context::{Context, REQUEST_ID_KEY};
use crate::error::Error;
use crate::handler::{BoxedService, Handler, Service};
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: String,
    request_id_header: Option<String>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use herald::Server;
    /// let server = Server::bind("0.0.0.0:3000").request_id_header("x-request-id");
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self { addr: addr.to_owned(), request_id_header: None }
    }

    /// Trust `name` as an upstream-supplied correlation id.
    ///
    /// Only set this when a proxy you control sets or sanitises the header.
    #[must_use]
    pub fn request_id_header(mut self, name: &str) -> Self {
        self.request_id_header = Some(name.to_owned());
        self
    }

    /// Starts accepting connections and dispatching them through `app`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, app: impl Handler) -> Result<(), Error> {
        let addr: SocketAddr = self.addr.parse().map_err(|source| Error::InvalidAddr {
            addr: self.addr.clone(),
            source,
        })?;
        let listener = TcpListener::bind(addr).await?;

        let app = app.into_service();
        let request_id_header: Option<Arc<str>> = self.request_id_header.map(Arc::from);

        info!(addr = %addr, "herald listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown wins over queued accepts.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let request_id_header = request_id_header.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            let request_id_header = request_id_header.clone();
                            async move { dispatch(app, req, request_id_header.as_deref()).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %peer, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connections so the set stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("herald stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through `app` and produces one hyper response.
///
/// Never returns `Err`: unreadable bodies become `400`, everything else is
/// whatever the service wrote into the root sink.
async fn dispatch(
    app: BoxedService,
    req: hyper::Request<Incoming>,
    request_id_header: Option<&str>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();
    let upstream_id = upstream_request_id(&parts.headers, request_id_header).map(str::to_owned);

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(
                path = %parts.uri.path(),
                request_id = upstream_id.as_deref(),
                error = %e,
                "failed to read request body"
            );
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_hyper());
        }
    };

    let req = Request::from_parts(parts, body);
    let context = seed_context(req.context(), upstream_id);
    let req = req.with_context(context);

    let mut sink = Response::default();
    app.call(req, &mut sink).await;
    Ok(sink.into_hyper())
}

/// The trusted header's value, when one is configured and the request
/// carries a non-blank value for it.
fn upstream_request_id<'h>(headers: &'h HeaderMap, name: Option<&str>) -> Option<&'h str> {
    headers
        .get(name?)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// The context a request starts with: empty, or carrying the upstream
/// correlation id.
fn seed_context(ctx: &Context, upstream_id: Option<String>) -> Context {
    match upstream_id {
        Some(id) => {
            debug!(request_id = %id, "using upstream request id");
            ctx.with_value(REQUEST_ID_KEY, id)
        }
        None => ctx.clone(),
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C only on Windows).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
