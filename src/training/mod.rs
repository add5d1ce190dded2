use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::error::{Result, SoftmaxError};
use crate::model::metrics::{accuracy, cross_entropy_loss};
use crate::model::Model;
use crate::parsing::DatasetSplit;

pub mod batch;
pub mod config;
pub mod history;

use batch::BatchLoader;
pub use config::TrainerConfig;
pub use history::{History, ValidationStats};

/// Fits a model with fixed-learning-rate mini-batch gradient descent.
/// The trainer borrows the model for the whole run
pub struct Trainer<'a, M: Model> {
    model: &'a mut M,
    data: &'a DatasetSplit,
    config: TrainerConfig,
    rng: StdRng,
}

impl<'a, M: Model> Trainer<'a, M> {
    pub fn new(model: &'a mut M, data: &'a DatasetSplit, config: TrainerConfig) -> Result<Self> {
        config.validate()?;

        if data.train.is_empty() || data.validation.is_empty() {
            return Err(SoftmaxError::EmptyDataset);
        }
        if config.batches_per_epoch(data.train.len()) == 0 {
            return Err(SoftmaxError::InvalidConfig(format!(
                "batch_size {} is larger than the {} training samples",
                config.batch_size,
                data.train.len()
            )));
        }
        for (context, dataset) in [
            ("train split", &data.train),
            ("validation split", &data.validation),
        ] {
            if dataset.data.nrows() != dataset.target.nrows() {
                return Err(SoftmaxError::ShapeMismatch {
                    context,
                    expected: (dataset.data.nrows(), dataset.target.ncols()),
                    found: dataset.target.dim(),
                });
            }
        }

        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Trainer {
            model,
            data,
            config,
            rng,
        })
    }

    fn reported_loss(&self, targets: &ArrayView2<f64>, outputs: &ArrayView2<f64>) -> f64 {
        let loss = cross_entropy_loss(targets, outputs);
        if self.config.penalty_in_loss {
            loss + self.model.penalty()
        } else {
            loss
        }
    }

    /// Forward, backward and GD step on one batch. Returns the loss on the batch
    pub fn train_step(&mut self, x_batch: &ArrayView2<f64>, y_batch: &ArrayView2<f64>) -> Result<f64> {
        let outputs = self.model.forward(x_batch)?;
        // Both loss terms come from the weights the outputs were computed with
        let loss = self.reported_loss(y_batch, &outputs.view());
        self.model.backward(x_batch, &outputs.view(), y_batch)?;
        self.model.apply_gradient(self.config.learning_rate);

        Ok(loss)
    }

    /// Validation loss plus train and validation accuracy over the full sets
    pub fn validation_step(&self) -> Result<ValidationStats> {
        let val_outputs = self.model.forward(&self.data.validation.data.view())?;
        let loss = self.reported_loss(&self.data.validation.target.view(), &val_outputs.view());
        let val_accuracy = accuracy(&val_outputs.view(), &self.data.validation.target.view());

        let train_outputs = self.model.forward(&self.data.train.data.view())?;
        let train_accuracy = accuracy(&train_outputs.view(), &self.data.train.target.view());

        Ok(ValidationStats {
            loss,
            train_accuracy,
            val_accuracy,
        })
    }

    /// Train for `num_epochs` epochs. Returns the train and validation histories
    pub fn train(mut self) -> Result<(History, History)> {
        let mut train_history = History::default();
        let mut val_history = History::default();
        let steps_per_val = self.config.steps_per_validation(self.data.train.len());
        let mut global_step = 0;
        let data = self.data;

        info!(
            epochs = self.config.num_epochs,
            batch_size = self.config.batch_size,
            learning_rate = self.config.learning_rate,
            steps_per_val,
            "starting training"
        );

        for epoch in 0..self.config.num_epochs {
            let batches = BatchLoader::new(
                &data.train,
                self.config.batch_size,
                self.config.shuffle,
                self.config.drop_last,
                &mut self.rng,
            );

            for (x_batch, y_batch) in batches {
                let loss = self.train_step(&x_batch.view(), &y_batch.view())?;
                if !loss.is_finite() {
                    warn!(step = global_step, loss, "non-finite training loss");
                }
                train_history.loss.push((global_step, loss));

                if global_step % steps_per_val == 0 {
                    let stats = self.validation_step()?;
                    debug!(
                        step = global_step,
                        val_loss = stats.loss,
                        train_accuracy = stats.train_accuracy,
                        val_accuracy = stats.val_accuracy,
                        "validation step"
                    );

                    val_history.loss.push((global_step, stats.loss));
                    train_history.accuracy.push((global_step, stats.train_accuracy));
                    val_history.accuracy.push((global_step, stats.val_accuracy));
                }

                global_step += 1;
            }

            info!(
                epoch = epoch + 1,
                train_loss = train_history.last_loss(),
                val_loss = val_history.last_loss(),
                val_accuracy = val_history.last_accuracy(),
                "finished epoch"
            );
        }

        Ok((train_history, val_history))
    }
}
