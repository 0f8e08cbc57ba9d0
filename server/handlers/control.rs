use std::io::Cursor;

use tiny_http::Response;

use crate::routes::{json_error, json_response, lock};
use crate::state::{RunStatus, SharedState};

/// `POST /train/stop`: asks the active run to stop at its next row.
pub fn handle_stop(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let st = lock(&state);
    match &st.status {
        RunStatus::Running { stop } => {
            stop.stop();
            json_response(202, r#"{"stopping":true}"#.to_owned())
        }
        _ => json_error(409, "no training run is active"),
    }
}

/// `GET /health`: worker status.
pub fn handle_health(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let st = lock(&state);
    let mut body = serde_json::json!({ "status": st.status_name() });
    match &st.status {
        RunStatus::Done { outcome } => body["outcome"] = serde_json::json!(outcome),
        RunStatus::Failed { reason } => body["error"] = serde_json::json!(reason),
        _ => {}
    }
    json_response(200, body.to_string())
}

/// `GET /snapshot`: latest checkpoint of the current or last run.
pub fn handle_snapshot(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let st = lock(&state);
    match &st.last_params {
        Some(params) => match serde_json::to_string_pretty(params) {
            Ok(json) => json_response(200, json),
            Err(e) => json_error(500, &e.to_string()),
        },
        None => json_error(404, "no snapshot available yet"),
    }
}
