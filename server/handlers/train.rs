use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use ferrite_mlp::{train, train_loop, Dataset, NetworkParams, StopReason, TrainingConfig, TrainingEvent};
use serde::Deserialize;
use tiny_http::Request;
use tracing::{info, warn};

use crate::routes::{json_error, lock};
use crate::state::{RunStatus, SharedState};
use crate::util::sse::{format_sse_event, write_sse, SSE_KEEPALIVE, SSE_RESPONSE_HEAD};

/// Body of `POST /train`: the worker configuration plus the dataset as CSV.
#[derive(Debug, Deserialize)]
struct TrainingJob {
    #[serde(flatten)]
    config: TrainingConfig,
    dataset: String,
}

/// `POST /train`: starts a run and streams its events as SSE.
///
/// Training happens on a background thread that pushes events into a
/// channel; this handler relays them as `event: IterationCompleted` /
/// `event: EpochCompleted` frames, with keep-alive pings every 500 ms, and
/// closes with `event: done` (or `event: failed`) once the channel hangs up.
/// A client disconnect stops the run.
pub fn handle_start(mut request: Request, state: SharedState) {
    let mut body = String::new();
    if let Err(e) = request.as_reader().read_to_string(&mut body) {
        let _ = request.respond(json_error(400, &format!("unreadable body: {e}")));
        return;
    }

    let job: TrainingJob = match serde_json::from_str(&body) {
        Ok(job) => job,
        Err(e) => {
            let _ = request.respond(json_error(400, &format!("invalid job: {e}")));
            return;
        }
    };

    let training = Dataset::parse_csv(&job.dataset).and_then(|ds| train(&job.config, &ds));
    let mut training = match training {
        Ok(t) => t,
        Err(e) => {
            let _ = request.respond(json_error(422, &e.to_string()));
            return;
        }
    };

    // Claim the worker; only one run at a time.
    {
        let mut st = lock(&state);
        if st.is_running() {
            drop(st);
            let _ = request.respond(json_error(409, "a training run is already active"));
            return;
        }
        st.status = RunStatus::Running { stop: training.stop_handle() };
        st.last_params = None;
    }

    let stop = training.stop_handle();
    let (tx, rx) = mpsc::channel::<TrainingEvent>();
    let worker = thread::spawn(move || {
        let outcome = train_loop(&mut training, &tx);
        let params = training.network().extract_network_params();
        (outcome, params)
    });

    let mut writer = request.into_writer();
    let mut connected = write_sse(&mut writer, SSE_RESPONSE_HEAD);

    loop {
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(event) => {
                lock(&state).last_params = Some(event.network_params().clone());
                if connected {
                    connected = match serde_json::to_string(&event) {
                        Ok(json) => write_sse(&mut writer, &format_sse_event(event.action(), &json)),
                        Err(_) => true,
                    };
                    if !connected {
                        info!("client disconnected; stopping run");
                        stop.stop();
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if connected && !write_sse(&mut writer, SSE_KEEPALIVE) {
                    connected = false;
                    stop.stop();
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    let final_frame = finish_run(worker.join(), &state);
    if connected {
        let _ = write_sse(&mut writer, &final_frame);
    }
}

/// Records the run's end in shared state and builds the closing SSE frame.
fn finish_run(
    joined: thread::Result<(ferrite_mlp::Result<StopReason>, NetworkParams)>,
    state: &SharedState,
) -> String {
    let mut st = lock(state);
    match joined {
        Ok((Ok(outcome), params)) => {
            info!(?outcome, "run finished");
            st.status = RunStatus::Done { outcome };
            st.last_params = Some(params);
            let data = serde_json::json!({ "outcome": outcome });
            format_sse_event("done", &data.to_string())
        }
        Ok((Err(e), params)) => {
            warn!("run failed: {e}");
            st.status = RunStatus::Failed { reason: e.to_string() };
            st.last_params = Some(params);
            let data = serde_json::json!({ "error": e.to_string() });
            format_sse_event("failed", &data.to_string())
        }
        Err(_) => {
            warn!("training thread panicked");
            st.status = RunStatus::Failed { reason: "training thread panicked".into() };
            format_sse_event("failed", r#"{"error":"training thread panicked"}"#)
        }
    }
}
