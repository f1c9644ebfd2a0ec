//! Request logging middleware.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use super::{IdentitySlot, Middleware, ResponseObserver, resolve_request_id, timestamp};
use crate::context;
use crate::handler::{self, BoxFuture, BoxedService, Handler, Service};
use crate::request::Request;
use crate::response::ResponseSink;

/// Emits exactly one `Request completed` event per request.
///
/// The event carries `app`, `timestamp`, `request_id`, `method`, `path`,
/// `status`, `duration` and `user_id` (empty when nobody authenticated).
/// A missing user id additionally produces a `Failed to get user ID from
/// context` warning; it never suppresses the completion event.
///
/// A panic in the inner handler unwinds straight through; no event is
/// emitted for that request.
pub struct Logging {
    mw: Middleware,
    inner: BoxedService,
}

impl Logging {
    pub(super) fn new(mw: Middleware, inner: BoxedService) -> Self {
        Self { mw, inner }
    }
}

impl Service for Logging {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        Box::pin(async move {
            let mw = &self.mw;
            let start = Instant::now();

            let (request_id, req) = resolve_request_id(req);
            let method = req.method().clone();
            let path = req.path().to_owned();
            let outer_user = context::user_id(req.context()).map(str::to_owned);
            let (slot, ctx) = IdentitySlot::attach(req.context());

            let mut observer = ResponseObserver::new(res);
            self.inner.call(req.with_context(ctx), &mut observer).await;

            let status = observer.status().as_u16();
            let duration = start.elapsed();
            let user_id = slot.get().or(outer_user);

            if user_id.is_none() {
                mw.emit(|| warn!(
                    app = %mw.app,
                    timestamp = %timestamp(),
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status,
                    duration = ?duration,
                    "Failed to get user ID from context"
                ));
            }

            mw.emit(|| info!(
                app = %mw.app,
                timestamp = %timestamp(),
                request_id = %request_id,
                method = %method,
                path = %path,
                status,
                duration = ?duration,
                user_id = %user_id.as_deref().unwrap_or(""),
                "Request completed"
            ));
        })
    }
}

impl handler::private::Sealed for Logging {}

impl Handler for Logging {
    fn into_service(self) -> BoxedService {
        Arc::new(self)
    }
}
