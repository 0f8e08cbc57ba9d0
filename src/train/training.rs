use std::borrow::BorrowMut;

use tracing::{debug, info, warn};

use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::network::{Network, StopHandle};
use crate::train::events::{StopReason, TrainingEvent};
use crate::train::learning_config::LearningConfig;

/// A parsed row: numeric features and the encoded expected output.
#[derive(Debug, Clone)]
struct Sample {
    features: Vec<f64>,
    expected: Vec<f64>,
}

/// Clears the network's learning flag when the run is dropped, whichever
/// way it ends.
#[derive(Debug)]
struct LearningGuard {
    handle: StopHandle,
}

impl Drop for LearningGuard {
    fn drop(&mut self) {
        self.handle.stop();
    }
}

/// A training run as a lazy, finite sequence of progress events.
///
/// Each call to `next()` does one unit of work: trains one row (yielding
/// `IterationCompleted`) or closes an epoch (yielding `EpochCompleted`).
/// The learning flag is polled before every step, so `stop_learning` takes
/// effect at the next row boundary.
///
/// `N` is either `&mut Network` (from [`Network::start_learning`]) or an
/// owned `Network` (from [`crate::train::train`]).
#[derive(Debug)]
pub struct Training<N: BorrowMut<Network>> {
    network: N,
    samples: Vec<Sample>,
    train_len: usize,
    config: LearningConfig,
    epoch: usize,
    row: usize,
    sse: f64,
    outcome: Option<StopReason>,
    guard: LearningGuard,
}

impl<N: BorrowMut<Network>> Training<N> {
    /// Validates `config`, splits and parses `dataset`, then sets the
    /// network's learning flag.
    pub fn new(network: N, dataset: &Dataset, config: &LearningConfig) -> Result<Training<N>> {
        config.validate()?;

        let net: &Network = network.borrow();
        if net.is_learning() {
            return Err(Error::InvalidState("a training run is already active".into()));
        }
        if dataset.feature_count() != net.input_width() {
            return Err(Error::DimensionMismatch {
                expected: net.input_width(),
                actual: dataset.feature_count(),
            });
        }

        let (train_len, val_len) = config.split(dataset.rows_count());
        if train_len == 0 {
            return Err(Error::InvalidConfig(format!(
                "train fraction {} leaves no training rows out of {}",
                config.train_fraction,
                dataset.rows_count()
            )));
        }

        let samples = (0..train_len + val_len)
            .map(|row| {
                let features = dataset.features(row)?;
                let label = dataset.label(row).unwrap_or_default();
                let expected = net.expected_output(label)?;
                Ok(Sample { features, expected })
            })
            .collect::<Result<Vec<_>>>()?;

        let handle = net.stop_handle();
        if !handle.engage() {
            return Err(Error::InvalidState("a training run is already active".into()));
        }

        info!(
            train_rows = train_len,
            validation_rows = val_len,
            max_epochs = config.max_epochs,
            learning_rate = config.learning_rate,
            "training started"
        );

        Ok(Training {
            network,
            samples,
            train_len,
            config: *config,
            epoch: 1,
            row: 0,
            sse: 0.0,
            outcome: None,
            guard: LearningGuard { handle },
        })
    }

    /// Why the run ended; `None` while it is still going.
    pub fn outcome(&self) -> Option<StopReason> {
        self.outcome
    }

    /// Epoch currently being trained (1-based).
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.guard.handle.clone()
    }

    pub fn network(&self) -> &Network {
        self.network.borrow()
    }

    /// Mutable access between events. Topology and reset calls made through
    /// it fail with `InvalidState` until the run ends.
    pub fn network_mut(&mut self) -> &mut Network {
        self.network.borrow_mut()
    }

    /// Consumes the remaining events and returns the stop reason.
    pub fn run_to_end(&mut self) -> Result<StopReason> {
        for event in self.by_ref() {
            event?;
        }
        Ok(self.outcome.unwrap_or(StopReason::Stopped))
    }

    /// Ends the run (clearing the learning flag) and hands the network back.
    pub fn into_network(self) -> N {
        self.network
    }

    fn finish(&mut self, reason: StopReason) {
        self.outcome = Some(reason);
        self.guard.handle.stop();
        match reason {
            StopReason::Converged => info!(epoch = self.epoch, "training converged"),
            StopReason::EpochBudgetExhausted => info!(epochs = self.config.max_epochs, "epoch budget exhausted"),
            StopReason::Stopped => info!(epoch = self.epoch, row = self.row, "training stopped"),
            StopReason::Failed => warn!(epoch = self.epoch, row = self.row, "training failed"),
        }
    }

    fn train_next_row(&mut self) -> Result<TrainingEvent> {
        let lr = self.config.learning_rate;
        let network: &mut Network = self.network.borrow_mut();
        let sample = &self.samples[self.row];
        self.sse += network.train_row(&sample.features, &sample.expected, lr)?;
        self.row += 1;
        Ok(TrainingEvent::IterationCompleted {
            network_params: self.network().extract_network_params(),
        })
    }

    /// Closes the current epoch. A converged epoch ends the run without an
    /// event; otherwise the validation error is measured and reported.
    fn complete_epoch(&mut self) -> Result<Option<TrainingEvent>> {
        let epoch = self.epoch;
        let mse = self.sse / self.train_len as f64;

        self.epoch += 1;
        self.row = 0;
        self.sse = 0.0;

        if mse <= self.config.target_error {
            debug!(epoch, mse, "epoch converged");
            self.finish(StopReason::Converged);
            return Ok(None);
        }

        let validation_error = self.validation_error()?;
        debug!(epoch, mse, ?validation_error, "epoch completed");

        if epoch >= self.config.max_epochs {
            self.finish(StopReason::EpochBudgetExhausted);
        }

        Ok(Some(TrainingEvent::EpochCompleted {
            network_params: self.network().extract_network_params(),
            epoch,
            mse,
            validation_error,
        }))
    }

    /// Mean squared error over the validation segment, without updating
    /// weights. `None` when the segment is empty.
    fn validation_error(&self) -> Result<Option<f64>> {
        let validation = &self.samples[self.train_len..];
        if validation.is_empty() {
            return Ok(None);
        }
        let network: &Network = self.network.borrow();
        let mut total = 0.0;
        for sample in validation {
            let output = network.predict_values(&sample.features)?;
            total += output.iter().zip(&sample.expected)
                .map(|(a, e)| (e - a).powi(2))
                .sum::<f64>();
        }
        Ok(Some(total / validation.len() as f64))
    }
}

impl<N: BorrowMut<Network>> Iterator for Training<N> {
    type Item = Result<TrainingEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.outcome.is_some() {
            return None;
        }
        if !self.guard.handle.is_learning() {
            self.finish(StopReason::Stopped);
            return None;
        }

        let step = if self.row < self.train_len {
            self.train_next_row().map(Some)
        } else {
            self.complete_epoch()
        };

        match step {
            Ok(event) => event.map(Ok),
            Err(e) => {
                self.finish(StopReason::Failed);
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::network::{NetworkConfig, TargetMode};

    fn separable(rows: usize) -> Dataset {
        let csv: String = (0..rows)
            .map(|i| {
                let x = (i as f64 - (rows as f64 - 1.0) / 2.0) / 10.0;
                format!("{x},{}\n", if x > 0.0 { 1 } else { 0 })
            })
            .collect();
        Dataset::parse_csv(&csv).unwrap()
    }

    fn network(ds: &Dataset) -> Network {
        let config = NetworkConfig::new(Activation::Tanh, Activation::Sigmoid, TargetMode::Classification)
            .with_seed(5);
        Network::new(ds, &config).unwrap()
    }

    #[test]
    fn iteration_events_precede_epoch_event() {
        let ds = separable(10);
        let mut net = network(&ds);
        let config = LearningConfig::new(0.1, 3, 0.0).with_split(0.6, 0.4);
        let events: Vec<TrainingEvent> = net
            .start_learning(&ds, &config)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        // 3 epochs × (6 rows + 1 epoch event)
        assert_eq!(events.len(), 21);
        for (epoch, chunk) in events.chunks(7).enumerate() {
            assert!(chunk[..6].iter().all(|e| matches!(e, TrainingEvent::IterationCompleted { .. })));
            match &chunk[6] {
                TrainingEvent::EpochCompleted { epoch: n, validation_error, .. } => {
                    assert_eq!(*n, epoch + 1);
                    assert!(validation_error.is_some());
                }
                other => panic!("expected EpochCompleted, got {other:?}"),
            }
        }
        assert!(!net.is_learning());
    }

    #[test]
    fn zero_validation_fraction_reports_no_validation_error() {
        let ds = separable(8);
        let mut net = network(&ds);
        let config = LearningConfig::new(0.1, 1, 0.0);
        let mut training = net.start_learning(&ds, &config).unwrap();
        let last = training.by_ref().last().unwrap().unwrap();
        match last {
            TrainingEvent::EpochCompleted { validation_error, mse, .. } => {
                assert_eq!(validation_error, None);
                assert!(mse.is_finite());
            }
            other => panic!("expected EpochCompleted, got {other:?}"),
        }
        assert_eq!(training.outcome(), Some(StopReason::EpochBudgetExhausted));
    }

    #[test]
    fn loose_target_converges_after_first_epoch() {
        let ds = separable(8);
        let mut net = network(&ds);
        let config = LearningConfig::new(0.1, 50, 10.0);
        let mut training = net.start_learning(&ds, &config).unwrap();
        assert_eq!(training.run_to_end().unwrap(), StopReason::Converged);
        assert_eq!(training.epoch(), 2);
    }

    #[test]
    fn converged_epoch_emits_no_epoch_event() {
        let ds = separable(4);
        let mut net = network(&ds);
        let config = LearningConfig::new(0.1, 50, 10.0).with_split(0.5, 0.5);
        let mut training = net.start_learning(&ds, &config).unwrap();
        let events: Vec<TrainingEvent> = training.by_ref().collect::<Result<_>>().unwrap();

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, TrainingEvent::IterationCompleted { .. })));
        assert_eq!(training.outcome(), Some(StopReason::Converged));
        assert!(training.next().is_none());
    }

    #[test]
    fn stop_is_observed_at_next_row() {
        let ds = separable(10);
        let mut net = network(&ds);
        let config = LearningConfig::new(0.1, 100, 0.0);
        let mut training = net.start_learning(&ds, &config).unwrap();
        assert!(training.next().unwrap().is_ok());
        assert!(training.next().unwrap().is_ok());

        training.network().stop_learning();
        assert!(training.next().is_none());
        assert_eq!(training.outcome(), Some(StopReason::Stopped));
        assert!(training.next().is_none());
    }

    #[test]
    fn mutation_during_run_is_rejected_and_harmless() {
        let ds = separable(6);
        let mut net = network(&ds);
        let config = LearningConfig::new(0.1, 2, 0.0);
        let mut training = net.start_learning(&ds, &config).unwrap();
        training.next().unwrap().unwrap();

        let before = training.network().extract_network_params();
        let result = training.network_mut().increase_hidden_layers();
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert!(matches!(training.network_mut().reset(), Err(Error::InvalidState(_))));
        assert_eq!(training.network().extract_network_params(), before);

        assert_eq!(training.run_to_end().unwrap(), StopReason::EpochBudgetExhausted);
        drop(training);
        assert!(net.increase_hidden_layers().is_ok());
    }

    #[test]
    fn dropping_a_run_clears_the_flag() {
        let ds = separable(6);
        let mut net = network(&ds);
        let config = LearningConfig::new(0.1, 5, 0.0);
        {
            let mut training = net.start_learning(&ds, &config).unwrap();
            training.next();
        }
        assert!(!net.is_learning());
        assert!(net.reset().is_ok());
    }

    #[test]
    fn empty_training_segment_is_rejected() {
        let ds = separable(3);
        let mut net = network(&ds);
        let config = LearningConfig::new(0.1, 5, 0.0).with_split(0.2, 0.5);
        assert!(matches!(net.start_learning(&ds, &config), Err(Error::InvalidConfig(_))));
        assert!(!net.is_learning());
    }

    #[test]
    fn dataset_must_match_input_width() {
        let ds = separable(6);
        let mut net = network(&ds);
        let wide = Dataset::parse_csv("1,2,0\n3,4,1\n").unwrap();
        let config = LearningConfig::new(0.1, 5, 0.0);
        assert!(matches!(
            net.start_learning(&wide, &config),
            Err(Error::DimensionMismatch { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn owned_network_round_trips_through_run() {
        let ds = separable(6);
        let net = network(&ds);
        let config = LearningConfig::new(0.1, 2, 0.0);
        let mut training = Training::new(net, &ds, &config).unwrap();
        training.run_to_end().unwrap();
        let net = training.into_network();
        assert!(!net.is_learning());
    }
}
