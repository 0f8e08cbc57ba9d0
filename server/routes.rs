use std::io::Cursor;
use std::sync::{MutexGuard, PoisonError};

use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::handlers;
use crate::state::{SharedState, WorkerState};

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub fn json_response(status: u16, body: String) -> Response<Cursor<Vec<u8>>> {
    let bytes = body.into_bytes();
    let len = bytes.len();
    let headers = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .map(|h| vec![h])
        .unwrap_or_default();
    Response::new(StatusCode(status), headers, Cursor::new(bytes), Some(len), None)
}

pub fn json_error(status: u16, message: &str) -> Response<Cursor<Vec<u8>>> {
    json_response(status, serde_json::json!({ "error": message }).to_string())
}

pub fn not_found() -> Response<Cursor<Vec<u8>>> {
    json_error(404, "not found")
}

/// Locks the shared state, recovering the data if a handler panicked while
/// holding the lock.
pub fn lock(state: &SharedState) -> MutexGuard<'_, WorkerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Dispatches incoming requests to the appropriate handler.
///
/// `POST /train` takes ownership of the request to stream SSE frames for
/// the whole run; every other handler returns a response.
pub fn dispatch(request: Request, state: SharedState) {
    let method = request.method().clone();
    let path = request.url().split('?').next().unwrap_or("").to_owned();

    if method == Method::Post && path == "/train" {
        handlers::train::handle_start(request, state);
        return;
    }

    let response = match (method, path.as_str()) {
        (Method::Post, "/train/stop") => handlers::control::handle_stop(state),
        (Method::Get,  "/health")     => handlers::control::handle_health(state),
        (Method::Get,  "/snapshot")   => handlers::control::handle_snapshot(state),
        _ => not_found(),
    };

    let _ = request.respond(response);
}
