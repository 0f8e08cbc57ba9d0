/// ferrite-mlp worker server
///
/// Ships training configuration in and progress events out over HTTP.
/// Served by a synchronous tiny_http server.
///
/// Run with:
///   cargo run --bin worker-server --release
/// Bind address comes from `FERRITE_MLP_ADDR` (default 127.0.0.1:7878).
///
/// Endpoints:
///   POST /train       : JSON job (config + CSV dataset); SSE event stream
///   POST /train/stop  : stop the active run at its next row
///   GET  /health      : worker status
///   GET  /snapshot    : latest network checkpoint
mod handlers;
mod routes;
mod state;
mod util;

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use tiny_http::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use state::WorkerState;

const DEFAULT_ADDR: &str = "127.0.0.1:7878";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr = std::env::var("FERRITE_MLP_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_owned());
    let server = match Server::http(&addr) {
        Ok(server) => server,
        Err(e) => {
            error!(%addr, "failed to bind HTTP server: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shared_state = Arc::new(Mutex::new(WorkerState::new()));
    info!(%addr, "worker server listening");

    // One thread per request: the SSE stream of `POST /train` blocks for the
    // whole run and must not stall `/train/stop`.
    for request in server.incoming_requests() {
        let state_clone = shared_state.clone();
        std::thread::spawn(move || {
            routes::dispatch(request, state_clone);
        });
    }

    ExitCode::SUCCESS
}
