use crate::error::{Result, SoftmaxError};

/// Hyperparameters of a single training run.
///
/// # Fields
/// - `num_epochs`: full passes over the training set
/// - `learning_rate`: fixed GD step size
/// - `batch_size`: samples per mini-batch
/// - `shuffle`: reshuffle the sample order every epoch
/// - `drop_last`: skip the trailing batch when it is smaller than `batch_size`
/// - `validations_per_epoch`: how many validation steps to spread over an epoch
/// - `penalty_in_loss`: add the regularization term to the reported losses
/// - `seed`: seed of the generator used for shuffling
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub num_epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub shuffle: bool,
    pub drop_last: bool,
    pub validations_per_epoch: usize,
    pub penalty_in_loss: bool,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_epochs: 50,
            learning_rate: 0.01,
            batch_size: 128,
            shuffle: true,
            drop_last: true,
            validations_per_epoch: 5,
            penalty_in_loss: false,
            seed: 0,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SoftmaxError::InvalidConfig(
                "batch_size must be at least 1".to_owned(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate < 0f64 {
            return Err(SoftmaxError::InvalidConfig(format!(
                "learning_rate must be finite and non-negative, got {}",
                self.learning_rate
            )));
        }
        if self.validations_per_epoch == 0 {
            return Err(SoftmaxError::InvalidConfig(
                "validations_per_epoch must be at least 1".to_owned(),
            ));
        }

        Ok(())
    }

    /// Number of batches one epoch over `num_samples` produces
    pub fn batches_per_epoch(&self, num_samples: usize) -> usize {
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            num_samples.div_ceil(self.batch_size)
        }
    }

    /// Validate every this many global steps
    pub fn steps_per_validation(&self, num_samples: usize) -> usize {
        (self.batches_per_epoch(num_samples) / self.validations_per_epoch).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TrainerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = TrainerConfig {
            batch_size: 0,
            ..TrainerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TrainerConfig {
            learning_rate: f64::NAN,
            ..TrainerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TrainerConfig {
            validations_per_epoch: 0,
            ..TrainerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_batch_counts() {
        let mut config = TrainerConfig {
            batch_size: 128,
            ..TrainerConfig::default()
        };
        assert_eq!(config.batches_per_epoch(1000), 7);
        assert_eq!(config.steps_per_validation(1000), 1);
        assert_eq!(config.steps_per_validation(60000), 93);

        config.drop_last = false;
        assert_eq!(config.batches_per_epoch(1000), 8);
    }
}
