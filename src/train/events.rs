use serde::{Deserialize, Serialize};

use crate::network::NetworkParams;

/// Progress events produced by a training run, in order: every
/// `IterationCompleted` of an epoch precedes that epoch's `EpochCompleted`.
///
/// Wire form: `{"action": "IterationCompleted", "networkParams": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all_fields = "camelCase")]
pub enum TrainingEvent {
    /// One training row has been fed forward and backpropagated.
    IterationCompleted {
        network_params: NetworkParams,
    },
    /// One pass over the training segment has finished without converging.
    /// The converged epoch ends the run without this event.
    EpochCompleted {
        network_params: NetworkParams,
        /// 1-based epoch number.
        epoch: usize,
        /// Training SSE divided by the training row count.
        mse: f64,
        /// Mean squared validation error; `None` when there is no validation
        /// segment.
        validation_error: Option<f64>,
    },
}

impl TrainingEvent {
    pub fn network_params(&self) -> &NetworkParams {
        match self {
            TrainingEvent::IterationCompleted { network_params }
            | TrainingEvent::EpochCompleted { network_params, .. } => network_params,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            TrainingEvent::IterationCompleted { .. } => "IterationCompleted",
            TrainingEvent::EpochCompleted { .. } => "EpochCompleted",
        }
    }
}

/// Why a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Epoch MSE reached the target error.
    Converged,
    /// `max_epochs` epochs completed.
    EpochBudgetExhausted,
    /// The learning flag was cleared (`stop_learning` / `StopHandle::stop`).
    Stopped,
    /// A row failed to train; the error was yielded by the sequence.
    Failed,
}
