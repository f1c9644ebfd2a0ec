//! Unified error type.

/// The error type returned by herald's fallible server operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. Middleware never
/// returns one either: identity and logging failures degrade the request,
/// they do not abort it. This type surfaces infrastructure failures only.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddr {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
