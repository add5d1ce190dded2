use ndarray::{Array2, ArrayView2};

use crate::error::Result;

pub mod metrics;
pub mod softmax;

/// A model the trainer can fit with plain gradient descent
pub trait Model {
    /// Class probabilities for every row of `inputs`
    fn forward(&self, inputs: &ArrayView2<f64>) -> Result<Array2<f64>>;
    /// Compute and store the gradient of the loss WRT the parameters
    fn backward(
        &mut self,
        inputs: &ArrayView2<f64>,
        outputs: &ArrayView2<f64>,
        targets: &ArrayView2<f64>,
    ) -> Result<()>;
    /// Perform a GD step with the stored gradient
    fn apply_gradient(&mut self, learning_rate: f64);
    /// Regularization term added to the loss, 0 for unregularized models
    fn penalty(&self) -> f64;
}
