//! Identity extraction middleware.

use std::sync::Arc;

use tracing::{info, warn};

use super::{IDENTITY_SLOT_KEY, IdentitySlot, Middleware, resolve_request_id, timestamp};
use crate::context::{CLAIMS_KEY, USER_ID_KEY};
use crate::handler::{self, BoxFuture, BoxedService, Handler, Service};
use crate::request::Request;
use crate::response::ResponseSink;

/// Puts the caller's identity into the request context.
///
/// Per request: resolve the correlation id, call the extractor once, then
///
/// - on success, log `User ID found in JWT` at INFO and call inward with
///   `user_id` and `claims` layered onto the context;
/// - on failure, log `Failed to extract JWT claims` at WARN and call inward
///   with no identity at all.
///
/// The inner handler runs either way.
pub struct Identity {
    mw: Middleware,
    inner: BoxedService,
}

impl Identity {
    pub(super) fn new(mw: Middleware, inner: BoxedService) -> Self {
        Self { mw, inner }
    }
}

impl Service for Identity {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        let mw = &self.mw;
        let (request_id, req) = resolve_request_id(req);

        let claims = match mw.extractor.extract(&req) {
            Ok(claims) => claims,
            Err(error) => {
                mw.emit(|| warn!(
                    app = %mw.app,
                    timestamp = %timestamp(),
                    request_id = %request_id,
                    error = %error,
                    "Failed to extract JWT claims"
                ));
                return self.inner.call(req, res);
            }
        };

        mw.emit(|| info!(
            app = %mw.app,
            timestamp = %timestamp(),
            request_id = %request_id,
            user_id = %claims.subject,
            "User ID found in JWT"
        ));

        if let Some(slot) = req.context().get::<Arc<IdentitySlot>>(IDENTITY_SLOT_KEY) {
            slot.publish(&claims.subject);
        }

        let ctx = req.context()
            .with_value(USER_ID_KEY, claims.subject.clone())
            .with_value(CLAIMS_KEY, claims);
        self.inner.call(req.with_context(ctx), res)
    }
}

impl handler::private::Sealed for Identity {}

impl Handler for Identity {
    fn into_service(self) -> BoxedService {
        Arc::new(self)
    }
}
