//! Request-scoped context carrier.
//!
//! Every [`Request`](crate::Request) carries a [`Context`]: an immutable,
//! layered key → value map that lives exactly as long as the request does.
//!
//! ```text
//! Context::new()                      ← created by the server per request
//!        ↓ .with_value("request_id", …)
//! [request_id] → ∅
//!        ↓ .with_value("user_id", …)
//! [user_id] → [request_id] → ∅        ← the parent snapshot is untouched
//! ```
//!
//! Layering never mutates a published snapshot. A middleware that adds a key
//! hands the *new* context downstream; anyone still holding the old one keeps
//! seeing exactly what they saw before. Cloning is one `Arc` increment.
//!
//! The well-known keys below are a stable contract between middleware and
//! handlers. Read them through the typed accessors ([`user_id`],
//! [`request_id`], [`claims`]) rather than [`Context::get`] directly: the
//! accessors collapse a value of the wrong type to `None`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::middleware::Claims;

/// The authenticated principal (`String`), set by the identity middleware.
pub const USER_ID_KEY: &str = "user_id";

/// The per-request correlation id (`String`).
pub const REQUEST_ID_KEY: &str = "request_id";

/// The full [`Claims`] the identity middleware extracted.
pub const CLAIMS_KEY: &str = "claims";

/// Where an upstream layer places an authorizer payload ([`Claims`]) for
/// [`AuthorizerClaims`](crate::middleware::AuthorizerClaims) to pick up.
pub const AUTHORIZER_KEY: &str = "authorizer";

type Value = Arc<dyn Any + Send + Sync>;

struct Entry {
    key: &'static str,
    value: Value,
    parent: Option<Arc<Entry>>,
}

/// Immutable, layered per-request key → value map.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Entry>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new context with `key` bound to `value`, shadowing any
    /// earlier binding of the same key. `self` is left as it was.
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(&self, key: &'static str, value: T) -> Self {
        Self {
            head: Some(Arc::new(Entry {
                key,
                value: Arc::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// The most recently layered value for `key`, untyped.
    pub fn value(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.entries()
            .find(|entry| entry.key == key)
            .map(|entry| &*entry.value)
    }

    /// The most recently layered value for `key`, if it is a `T`.
    ///
    /// A binding of another type yields `None`; it does not fall through to
    /// an older binding of the right type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.value(key)?.downcast_ref::<T>()
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        std::iter::successors(self.head.as_deref(), |entry| entry.parent.as_deref())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries().map(|entry| entry.key))
            .finish()
    }
}

/// The authenticated user id, if one was set as a `String`.
pub fn user_id(ctx: &Context) -> Option<&str> {
    ctx.get::<String>(USER_ID_KEY).map(String::as_str)
}

/// The correlation id, if one was set as a `String`.
pub fn request_id(ctx: &Context) -> Option<&str> {
    ctx.get::<String>(REQUEST_ID_KEY).map(String::as_str)
}

/// The extracted claims, if the identity middleware found any.
pub fn claims(ctx: &Context) -> Option<&Claims> {
    ctx.get::<Claims>(CLAIMS_KEY)
}
