//! Status-recording response sink.

use std::io;

use http::StatusCode;

use crate::response::ResponseSink;

/// Wraps a [`ResponseSink`] and remembers the last status written through it.
///
/// Everything is forwarded to the inner sink unchanged. The observed status
/// starts at `200 OK`, matching what a response gets when a handler never
/// sets one explicitly.
#[derive(Debug)]
pub struct ResponseObserver<S> {
    inner: S,
    status: StatusCode,
}

impl<S: ResponseSink> ResponseObserver<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, status: StatusCode::OK }
    }

    /// The last status set through this observer, or `200 OK`.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ResponseSink> ResponseSink for ResponseObserver<S> {
    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
        self.inner.set_status(status);
    }

    fn append_header(&mut self, name: &str, value: &str) {
        self.inner.append_header(name, value);
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Response;

    #[test]
    fn default_status_is_ok() {
        let observer = ResponseObserver::new(Response::default());
        assert_eq!(observer.status(), StatusCode::OK);
    }

    #[test]
    fn custom_status_is_recorded_and_forwarded() {
        let mut observer = ResponseObserver::new(Response::default());
        observer.set_status(StatusCode::CREATED);

        assert_eq!(observer.status(), StatusCode::CREATED);
        assert_eq!(observer.get_ref().status_code(), StatusCode::CREATED);
    }

    #[test]
    fn error_status_is_recorded_and_forwarded() {
        let mut observer = ResponseObserver::new(Response::default());
        observer.set_status(StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(observer.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(observer.into_inner().status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn last_status_wins() {
        let mut observer = ResponseObserver::new(Response::default());
        observer.set_status(StatusCode::ACCEPTED);
        observer.set_status(StatusCode::BAD_REQUEST);

        assert_eq!(observer.status(), StatusCode::BAD_REQUEST);
        assert_eq!(observer.get_ref().status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn status_then_write_keeps_status() {
        let mut observer = ResponseObserver::new(Response::default());
        observer.set_status(StatusCode::NOT_FOUND);
        observer.write(b"missing").unwrap();

        assert_eq!(observer.status(), StatusCode::NOT_FOUND);
        assert_eq!(observer.get_ref().body(), b"missing");
    }

    #[test]
    fn write_alone_leaves_default_status() {
        let mut observer = ResponseObserver::new(Response::default());
        observer.write(b"test response data").unwrap();

        assert_eq!(observer.status(), StatusCode::OK);
        assert_eq!(observer.into_inner().body(), b"test response data");
    }

    #[test]
    fn wraps_a_borrowed_sink() {
        let mut sink = Response::default();
        {
            let dyn_sink: &mut dyn ResponseSink = &mut sink;
            let mut observer = ResponseObserver::new(dyn_sink);
            observer.append_header("x-trace", "1");
            observer.set_status(StatusCode::IM_A_TEAPOT);
        }
        assert_eq!(sink.status_code(), StatusCode::IM_A_TEAPOT);
        assert_eq!(sink.header("x-trace"), Some("1"));
    }
}
