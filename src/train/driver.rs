use std::borrow::BorrowMut;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::Dataset;
use crate::error::Result;
use crate::network::{Network, NetworkConfig, NetworkParams, TargetMode};
use crate::train::events::{StopReason, TrainingEvent};
use crate::train::learning_config::LearningConfig;
use crate::train::training::Training;

/// Row split of the dataset: a training segment from the top followed by a
/// validation segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub train: f64,
    pub validation: f64,
}

impl Default for Split {
    fn default() -> Self {
        Split { train: 1.0, validation: 0.0 }
    }
}

/// Inbound configuration shipped to a worker, minus the dataset.
///
/// Wire names are camelCase:
/// ```json
/// {
///   "networkParams": null,
///   "hiddenActivation": "tanh",
///   "outputActivation": "sigmoid",
///   "mode": "classification",
///   "split": { "train": 0.8, "validation": 0.2 },
///   "epochs": 500,
///   "learningRate": 0.1,
///   "errorGoal": 0.01
/// }
/// ```
/// Activation names are resolved when the network is built, so an unknown
/// name fails with `Error::UnknownActivation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingConfig {
    /// Checkpoint to resume from; a fresh network is built when absent.
    #[serde(default)]
    pub network_params: Option<NetworkParams>,
    pub hidden_activation: String,
    pub output_activation: String,
    #[serde(default)]
    pub mode: TargetMode,
    #[serde(default)]
    pub split: Split,
    pub epochs: usize,
    pub learning_rate: f64,
    pub error_goal: f64,
    /// Weight-initialization seed; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainingConfig {
    pub fn network_config(&self) -> Result<NetworkConfig> {
        let config = NetworkConfig::from_names(&self.hidden_activation, &self.output_activation, self.mode)?;
        Ok(match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        })
    }

    pub fn learning_config(&self) -> LearningConfig {
        LearningConfig::new(self.learning_rate, self.epochs, self.error_goal)
            .with_split(self.split.train, self.split.validation)
    }
}

/// Builds the network a worker trains: restored from `network_params` when
/// present, otherwise the default topology.
pub fn build_network(config: &TrainingConfig, dataset: &Dataset) -> Result<Network> {
    let network_config = config.network_config()?;
    match &config.network_params {
        Some(params) => Network::from_params(dataset, &network_config, params),
        None => Network::new(dataset, &network_config),
    }
}

/// `train(config) -> event sequence`: builds the network and returns the
/// training run that owns it. Nothing happens until the sequence is iterated.
pub fn train(config: &TrainingConfig, dataset: &Dataset) -> Result<Training<Network>> {
    let network = build_network(config, dataset)?;
    Training::new(network, dataset, &config.learning_config())
}

/// Drives `training` to completion, sending every event to `progress_tx`.
///
/// # Early termination
/// The loop stops the run if the receiver has been dropped, and ends early
/// when the run's `StopHandle` is stopped from another thread.
pub fn train_loop<N: BorrowMut<Network>>(
    training: &mut Training<N>,
    progress_tx: &mpsc::Sender<TrainingEvent>,
) -> Result<StopReason> {
    while let Some(event) = training.next() {
        if progress_tx.send(event?).is_err() {
            debug!("progress receiver dropped; stopping run");
            training.stop_handle().stop();
        }
    }
    Ok(training.outcome().unwrap_or(StopReason::Stopped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn config_json(extra: &str) -> String {
        format!(
            r#"{{
                "hiddenActivation": "tanh",
                "outputActivation": "sig",
                "split": {{ "train": 0.75, "validation": 0.25 }},
                "epochs": 2,
                "learningRate": 0.2,
                "errorGoal": 0.0,
                "seed": 9{extra}
            }}"#
        )
    }

    fn dataset() -> Dataset {
        Dataset::parse_csv("-1,0\n-0.5,0\n0.5,1\n1,1\n").unwrap()
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: TrainingConfig = serde_json::from_str(&config_json("")).unwrap();
        assert_eq!(config.mode, TargetMode::Classification);
        assert!(config.network_params.is_none());
        let learning = config.learning_config();
        assert_eq!(learning.max_epochs, 2);
        assert_eq!(learning.split(4), (3, 1));
    }

    #[test]
    fn unknown_activation_fails_at_build() {
        let mut config: TrainingConfig = serde_json::from_str(&config_json("")).unwrap();
        config.hidden_activation = "gelu".into();
        assert!(matches!(train(&config, &dataset()), Err(Error::UnknownActivation(_))));
    }

    #[test]
    fn train_yields_full_event_sequence() {
        let config: TrainingConfig = serde_json::from_str(&config_json("")).unwrap();
        let events: Vec<TrainingEvent> = train(&config, &dataset()).unwrap().collect::<Result<_>>().unwrap();
        // 2 epochs × (3 rows + epoch event)
        assert_eq!(events.len(), 8);
        assert_eq!(events[3].action(), "EpochCompleted");
        assert_eq!(events[7].action(), "EpochCompleted");
    }

    #[test]
    fn resumes_from_snapshot() {
        let config: TrainingConfig = serde_json::from_str(&config_json("")).unwrap();
        let mut training = train(&config, &dataset()).unwrap();
        training.run_to_end().unwrap();
        let params = training.network().extract_network_params();

        let mut resumed = config.clone();
        resumed.network_params = Some(params.clone());
        let network = build_network(&resumed, &dataset()).unwrap();
        assert_eq!(network.extract_network_params(), params);
    }

    #[test]
    fn train_loop_forwards_events_in_order() {
        let config: TrainingConfig = serde_json::from_str(&config_json("")).unwrap();
        let mut training = train(&config, &dataset()).unwrap();
        let (tx, rx) = mpsc::channel();
        let reason = train_loop(&mut training, &tx).unwrap();
        drop(tx);

        assert_eq!(reason, StopReason::EpochBudgetExhausted);
        let actions: Vec<&str> = rx.iter().map(|e| e.action()).collect();
        assert_eq!(
            actions,
            vec![
                "IterationCompleted", "IterationCompleted", "IterationCompleted", "EpochCompleted",
                "IterationCompleted", "IterationCompleted", "IterationCompleted", "EpochCompleted",
            ]
        );
    }

    #[test]
    fn train_loop_stops_when_receiver_is_gone() {
        let config: TrainingConfig = serde_json::from_str(&config_json("")).unwrap();
        let mut training = train(&config, &dataset()).unwrap();
        let (tx, rx) = mpsc::channel();
        drop(rx);
        assert_eq!(train_loop(&mut training, &tx).unwrap(), StopReason::Stopped);
    }

    #[test]
    fn events_use_transport_field_names() {
        let config: TrainingConfig = serde_json::from_str(&config_json("")).unwrap();
        let mut training = train(&config, &dataset()).unwrap();
        let first = training.next().unwrap().unwrap();
        let json = serde_json::to_value(&first).unwrap();
        assert_eq!(json["action"], "IterationCompleted");
        assert!(json["networkParams"]["hiddenLayers"].is_array());
        assert!(json["networkParams"]["outputLayer"].is_array());

        let epoch = training.by_ref().find(|e| matches!(e, Ok(TrainingEvent::EpochCompleted { .. })));
        let json = serde_json::to_value(epoch.unwrap().unwrap()).unwrap();
        assert_eq!(json["action"], "EpochCompleted");
        assert!(json["mse"].is_number());
        assert!(json["validationError"].is_number());
    }
}
