use std::sync::{Arc, Mutex};

use ferrite_mlp::{NetworkParams, StopHandle, StopReason};

// ---------------------------------------------------------------------------
// Run status
// ---------------------------------------------------------------------------

pub enum RunStatus {
    /// No run has been started yet.
    Idle,
    /// A run is streaming events; `stop` ends it at the next row.
    Running { stop: StopHandle },
    /// The last run ended (converged, exhausted, stopped).
    Done { outcome: StopReason },
    /// The last run failed after it started.
    Failed { reason: String },
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct WorkerState {
    pub status: RunStatus,
    /// Checkpoint from the most recent event of the most recent run.
    pub last_params: Option<NetworkParams>,
}

impl WorkerState {
    pub fn new() -> Self {
        WorkerState { status: RunStatus::Idle, last_params: None }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, RunStatus::Running { .. })
    }

    /// Short status name used by `GET /health`.
    pub fn status_name(&self) -> &'static str {
        match self.status {
            RunStatus::Idle => "idle",
            RunStatus::Running { .. } => "running",
            RunStatus::Done { .. } => "done",
            RunStatus::Failed { .. } => "failed",
        }
    }
}

/// Passed to every handler.
pub type SharedState = Arc<Mutex<WorkerState>>;
