//! The comparison runs: an unregularized baseline, a regularized model and a
//! sweep over the L2 strength.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::error::{Result, SoftmaxError};
use crate::model::metrics::{calculate_accuracy, calculate_loss};
use crate::model::softmax::{InitMethod, SoftmaxModel};
use crate::parsing::DatasetSplit;
use crate::training::{History, Trainer, TrainerConfig};

/// Offset of the weight initialization seed from the shuffle seed, so the two
/// generators never share a stream
const INIT_SEED_OFFSET: u64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub trainer: TrainerConfig,
    /// L2 strength of the single regularized run
    pub regularized_lambda: f64,
    /// L2 strengths of the sweep
    pub lambdas: Vec<f64>,
    pub init: InitMethod,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            trainer: TrainerConfig::default(),
            regularized_lambda: 1.0,
            lambdas: vec![1.0, 0.1, 0.01, 0.001],
            init: InitMethod::Zeros,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        self.trainer.validate()?;

        if let Some(lambda) = std::iter::once(&self.regularized_lambda)
            .chain(&self.lambdas)
            .find(|l| !l.is_finite() || **l < 0f64)
        {
            return Err(SoftmaxError::InvalidConfig(format!(
                "L2 lambda must be finite and non-negative, got {}",
                lambda
            )));
        }

        Ok(())
    }
}

/// Cross-entropy and accuracy of a trained model over both full sets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalMetrics {
    pub train_loss: f64,
    pub val_loss: f64,
    pub train_accuracy: f64,
    pub val_accuracy: f64,
}

impl FinalMetrics {
    pub fn evaluate(model: &SoftmaxModel, data: &DatasetSplit) -> Result<FinalMetrics> {
        let (train_x, train_y) = (data.train.data.view(), data.train.target.view());
        let (val_x, val_y) = (data.validation.data.view(), data.validation.target.view());

        Ok(FinalMetrics {
            train_loss: calculate_loss(&train_x, &train_y, model)?,
            val_loss: calculate_loss(&val_x, &val_y, model)?,
            train_accuracy: calculate_accuracy(&train_x, &train_y, model)?,
            val_accuracy: calculate_accuracy(&val_x, &val_y, model)?,
        })
    }
}

/// A trained model together with everything reporting needs about it
#[derive(Debug, Clone)]
pub struct RunResult {
    pub name: String,
    pub lambda: f64,
    pub model: SoftmaxModel,
    pub train_history: History,
    pub val_history: History,
    pub metrics: FinalMetrics,
}

impl RunResult {
    /// Weight norm the sweep compares (largest singular value)
    pub fn weight_norm(&self) -> f64 {
        self.model.spectral_norm()
    }
}

#[derive(Debug, Clone)]
pub struct ExperimentResults {
    pub baseline: RunResult,
    pub regularized: RunResult,
    pub sweep: Vec<RunResult>,
}

/// Train one freshly initialized model with the given L2 strength
pub fn train_model(
    name: &str,
    data: &DatasetSplit,
    lambda: f64,
    config: &ExperimentConfig,
) -> Result<RunResult> {
    info!(run = name, lambda, "training model");

    let mut init_rng = StdRng::seed_from_u64(config.trainer.seed.wrapping_add(INIT_SEED_OFFSET));
    let mut model = SoftmaxModel::with_init(lambda, config.init, &mut init_rng);
    let (train_history, val_history) =
        Trainer::new(&mut model, data, config.trainer.clone())?.train()?;
    let metrics = FinalMetrics::evaluate(&model, data)?;

    info!(
        run = name,
        train_loss = metrics.train_loss,
        val_loss = metrics.val_loss,
        val_accuracy = metrics.val_accuracy,
        "finished run"
    );

    Ok(RunResult {
        name: name.to_owned(),
        lambda,
        model,
        train_history,
        val_history,
        metrics,
    })
}

/// Run the baseline, the regularized model and the lambda sweep in order
pub fn run(data: &DatasetSplit, config: &ExperimentConfig) -> Result<ExperimentResults> {
    config.validate()?;

    let baseline = train_model("softmax", data, 0f64, config)?;
    let regularized = train_model("softmax_l2", data, config.regularized_lambda, config)?;

    let sweep = config
        .lambdas
        .iter()
        .map(|&lambda| {
            let result = train_model(&format!("lambda_{}", lambda), data, lambda, config)?;
            info!(lambda, norm = result.weight_norm(), "sweep point");
            Ok(result)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ExperimentResults {
        baseline,
        regularized,
        sweep,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{RawSplit, NUM_CLASSES, NUM_FEATURES};
    use ndarray::Array2;

    fn blank_split(n: usize) -> DatasetSplit {
        let raw = RawSplit {
            images: Array2::zeros((n, NUM_FEATURES)),
            labels: (0..n).map(|i| i % NUM_CLASSES).collect(),
        };
        DatasetSplit::from_raw(&raw, &raw).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ExperimentConfig::default();

        assert_eq!(config.lambdas, vec![1.0, 0.1, 0.01, 0.001]);
        assert_eq!(config.regularized_lambda, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_lambda() {
        let config = ExperimentConfig {
            lambdas: vec![0.1, -1.0],
            ..ExperimentConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(SoftmaxError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_init_draws_from_own_seed() {
        let data = blank_split(20);
        let config = ExperimentConfig {
            trainer: TrainerConfig {
                num_epochs: 1,
                learning_rate: 0.0,
                batch_size: 10,
                seed: 7,
                ..TrainerConfig::default()
            },
            init: InitMethod::Uniform,
            ..ExperimentConfig::default()
        };
        let run = train_model("uniform", &data, 0.0, &config).unwrap();

        let own = SoftmaxModel::with_init(0.0, InitMethod::Uniform, &mut StdRng::seed_from_u64(8));
        let shuffle = SoftmaxModel::with_init(0.0, InitMethod::Uniform, &mut StdRng::seed_from_u64(7));
        assert_eq!(run.model.w, own.w);
        assert_ne!(run.model.w, shuffle.w);
    }
}
