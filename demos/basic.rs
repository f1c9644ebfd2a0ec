//! Identity + request logging in front of a small router.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/whoami
//!   curl -H 'x-auth-subject: alice' http://localhost:3000/whoami
//!   curl -H 'x-request-id: abc-123' -H 'x-auth-subject: alice' \
//!        -X POST http://localhost:3000/notes -d 'remember the milk'
//!   curl http://localhost:3000/nope

use herald::middleware::{Middleware, ProxyHeaders};
use herald::{Request, Response, Router, Server, context};
use http::{Method, StatusCode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // In production nginx sets x-auth-subject after auth_request succeeds
    // and strips it from client requests.
    let mw = Middleware::new("notes-api").with_extractor(ProxyHeaders::default());

    let app = Router::new()
        .on(Method::GET,  "/whoami", whoami)
        .on(Method::POST, "/notes",  create_note);

    Server::bind("0.0.0.0:3000")
        .request_id_header("x-request-id")
        .serve(mw.logging(mw.identity(app)))
        .await
        .expect("server error");
}

// GET /whoami
async fn whoami(req: Request) -> Response {
    let user = context::user_id(req.context()).unwrap_or("anonymous");
    let request_id = context::request_id(req.context()).unwrap_or("-");
    Response::builder()
        .header("x-request-id", request_id)
        .text(format!("you are {user}"))
}

// POST /notes → 201, or 401 for anonymous callers. The middleware never
// rejects; handlers decide.
async fn create_note(req: Request) -> Response {
    if context::user_id(req.context()).is_none() {
        return Response::status(StatusCode::UNAUTHORIZED);
    }
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/notes/1")
        .json(br#"{"id":"1"}"#.to_vec())
}
