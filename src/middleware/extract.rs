//! Claims and the [`Extractor`] capability.
//!
//! herald never decodes or verifies tokens itself. Something upstream does:
//! an API-gateway authorizer, an nginx `auth_request` subrequest, or your own
//! JWT library behind a custom [`Extractor`]. The identity middleware only
//! asks the extractor for [`Claims`] and reacts to the answer.

use crate::context::{AUTHORIZER_KEY, Context};
use crate::request::Request;

/// Decoded assertions about the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Claims {
    /// The authenticated principal.
    pub subject: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub auth_time: Option<String>,
    pub expires_at: Option<String>,
    pub issued_at: Option<String>,
    pub token_id: Option<String>,
    pub scope: Option<String>,
}

impl Claims {
    /// Claims carrying only a subject.
    pub fn new(subject: impl Into<String>) -> Self {
        Self { subject: subject.into(), ..Self::default() }
    }
}

/// Why an [`Extractor`] produced no claims.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no claims present on request")]
    Missing,

    #[error("malformed claims: {0}")]
    Malformed(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Produces [`Claims`] for a request.
///
/// Called exactly once per request that passes through the identity
/// middleware, synchronously, before the inner handler runs. Closures with
/// the right signature are extractors:
///
/// ```rust
/// use herald::Request;
/// use herald::middleware::{Claims, ExtractError, Middleware};
///
/// let mw = Middleware::new("billing").with_extractor(|req: &Request| {
///     req.header("x-user")
///         .map(Claims::new)
///         .ok_or(ExtractError::Missing)
/// });
/// ```
pub trait Extractor: Send + Sync + 'static {
    fn extract(&self, req: &Request) -> Result<Claims, ExtractError>;
}

impl<F> Extractor for F
where
    F: Fn(&Request) -> Result<Claims, ExtractError> + Send + Sync + 'static,
{
    fn extract(&self, req: &Request) -> Result<Claims, ExtractError> {
        self(req)
    }
}

/// Reads the [`Claims`] an upstream layer placed in the request context under
/// [`AUTHORIZER_KEY`]. The default extractor.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuthorizerClaims;

impl AuthorizerClaims {
    fn from_context(ctx: &Context) -> Result<Claims, ExtractError> {
        match ctx.value(AUTHORIZER_KEY) {
            None => Err(ExtractError::Missing),
            Some(payload) => payload
                .downcast_ref::<Claims>()
                .cloned()
                .ok_or_else(|| ExtractError::Malformed("authorizer payload is not claims".into())),
        }
    }
}

impl Extractor for AuthorizerClaims {
    fn extract(&self, req: &Request) -> Result<Claims, ExtractError> {
        Self::from_context(req.context())
    }
}

/// Reads the principal from headers set by a trusted reverse proxy.
///
/// The proxy authenticates (e.g. nginx `auth_request` with
/// `auth_request_set`) and forwards the subject, and optionally the scope.
/// Make sure the proxy strips these headers from client requests.
#[derive(Clone, Debug)]
pub struct ProxyHeaders {
    subject: String,
    scope: Option<String>,
}

impl ProxyHeaders {
    pub const DEFAULT_SUBJECT: &'static str = "x-auth-subject";
    pub const DEFAULT_SCOPE: &'static str = "x-auth-scope";

    pub fn new(subject_header: impl Into<String>) -> Self {
        Self { subject: subject_header.into(), scope: None }
    }

    #[must_use]
    pub fn with_scope(mut self, scope_header: impl Into<String>) -> Self {
        self.scope = Some(scope_header.into());
        self
    }
}

impl Default for ProxyHeaders {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SUBJECT).with_scope(Self::DEFAULT_SCOPE)
    }
}

impl Extractor for ProxyHeaders {
    fn extract(&self, req: &Request) -> Result<Claims, ExtractError> {
        let subject = req.header(&self.subject).ok_or(ExtractError::Missing)?;
        let scope = self.scope.as_deref()
            .and_then(|name| req.header(name))
            .map(str::to_owned);
        Ok(Claims { scope, ..Claims::new(subject) })
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    #[test]
    fn authorizer_claims_from_context() {
        let claims = Claims { issuer: Some("https://idp".into()), ..Claims::new("alice") };
        let req = Request::new(Method::GET, "/");
        let ctx = req.context().with_value(AUTHORIZER_KEY, claims.clone());
        let req = req.with_context(ctx);

        assert_eq!(AuthorizerClaims.extract(&req).unwrap(), claims);
    }

    #[test]
    fn authorizer_claims_missing() {
        let req = Request::new(Method::GET, "/");
        assert!(matches!(AuthorizerClaims.extract(&req), Err(ExtractError::Missing)));
    }

    #[test]
    fn authorizer_payload_of_wrong_type_is_malformed() {
        let req = Request::new(Method::GET, "/");
        let ctx = req.context().with_value(AUTHORIZER_KEY, "alice".to_owned());
        let req = req.with_context(ctx);

        assert!(matches!(AuthorizerClaims.extract(&req), Err(ExtractError::Malformed(_))));
    }

    #[test]
    fn proxy_headers_read_subject_and_scope() {
        let req = Request::new(Method::GET, "/")
            .with_header("X-Auth-Subject", "bob")
            .with_header("X-Auth-Scope", "read write");

        let claims = ProxyHeaders::default().extract(&req).unwrap();
        assert_eq!(claims.subject, "bob");
        assert_eq!(claims.scope.as_deref(), Some("read write"));
    }

    #[test]
    fn proxy_headers_without_subject_is_missing() {
        let req = Request::new(Method::GET, "/").with_header("x-auth-scope", "read");
        assert!(matches!(ProxyHeaders::default().extract(&req), Err(ExtractError::Missing)));
    }

    #[test]
    fn closures_are_extractors() {
        let extractor = |_req: &Request| -> Result<Claims, ExtractError> {
            Err(ExtractError::Other("token expired".into()))
        };
        let err = extractor.extract(&Request::new(Method::GET, "/")).unwrap_err();
        assert_eq!(err.to_string(), "token expired");
    }
}
