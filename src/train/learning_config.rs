use crate::error::{Error, Result};

/// Hyperparameters for one `start_learning` run.
///
/// # Fields
/// - `learning_rate`      : gradient-descent step size, `> 0`
/// - `train_fraction`     : share of rows, from the top, used for training
/// - `validation_fraction`: share of rows following the training segment
///                           used for validation
/// - `max_epochs`         : hard epoch budget, `> 0`
/// - `target_error`       : training MSE at or below which the run stops
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningConfig {
    pub learning_rate: f64,
    pub train_fraction: f64,
    pub validation_fraction: f64,
    pub max_epochs: usize,
    pub target_error: f64,
}

impl LearningConfig {
    /// Trains on every row with no validation segment.
    pub fn new(learning_rate: f64, max_epochs: usize, target_error: f64) -> Self {
        LearningConfig {
            learning_rate,
            train_fraction: 1.0,
            validation_fraction: 0.0,
            max_epochs,
            target_error,
        }
    }

    pub fn with_split(mut self, train_fraction: f64, validation_fraction: f64) -> Self {
        self.train_fraction = train_fraction;
        self.validation_fraction = validation_fraction;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        for (name, value) in [("train", self.train_fraction), ("validation", self.validation_fraction)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} fraction must be within [0, 1], got {value}"
                )));
            }
        }
        if self.max_epochs == 0 {
            return Err(Error::InvalidConfig("epoch budget must be at least 1".into()));
        }
        if !(self.target_error.is_finite() && self.target_error >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "target error must be finite and >= 0, got {}",
                self.target_error
            )));
        }
        Ok(())
    }

    /// `(train_len, validation_len)` for `rows` rows. The validation segment
    /// is clipped to the rows left after the training segment.
    pub fn split(&self, rows: usize) -> (usize, usize) {
        let train_len = ((rows as f64 * self.train_fraction).floor() as usize).min(rows);
        let val_len = ((rows as f64 * self.validation_fraction).floor() as usize).min(rows - train_len);
        (train_len, val_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_floors_both_segments() {
        let config = LearningConfig::new(0.1, 10, 0.0).with_split(0.7, 0.2);
        assert_eq!(config.split(10), (7, 2));
        assert_eq!(config.split(9), (6, 1));
        assert_eq!(config.split(3), (2, 0));
    }

    #[test]
    fn split_clips_validation_to_remaining_rows() {
        let config = LearningConfig::new(0.1, 10, 0.0).with_split(0.8, 0.5);
        assert_eq!(config.split(10), (8, 2));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(LearningConfig::new(0.1, 10, 0.01).validate().is_ok());
        assert!(LearningConfig::new(0.0, 10, 0.01).validate().is_err());
        assert!(LearningConfig::new(f64::NAN, 10, 0.01).validate().is_err());
        assert!(LearningConfig::new(0.1, 0, 0.01).validate().is_err());
        assert!(LearningConfig::new(0.1, 10, -1.0).validate().is_err());
        assert!(LearningConfig::new(0.1, 10, 0.0).with_split(1.2, 0.0).validate().is_err());
        assert!(LearningConfig::new(0.1, 10, 0.0).with_split(0.5, -0.1).validate().is_err());
    }
}
