use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut1, Axis};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use super::Model;
use crate::error::{Result, SoftmaxError};
use crate::parsing::{NUM_CLASSES, NUM_INPUTS};

const POWER_ITERATIONS: usize = 1000;
const POWER_TOLERANCE: f64 = 1e-12;

/// Single-layer softmax classifier: probabilities = softmax(X . W)
#[derive(Debug, Clone)]
pub struct SoftmaxModel {
    /// [inputs, classes]; the last row holds the bias weights
    pub w: Array2<f64>,
    /// Gradient of the last backward pass, same shape as `w`
    pub grad: Array2<f64>,
    pub l2_reg_lambda: f64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InitMethod {
    #[default]
    Zeros,
    Uniform,
}

impl SoftmaxModel {
    /// Zero-initialized model over the 785 MNIST inputs and 10 classes
    pub fn new(l2_reg_lambda: f64) -> SoftmaxModel {
        SoftmaxModel::with_shape(NUM_INPUTS, NUM_CLASSES, l2_reg_lambda)
    }

    pub fn with_shape(num_inputs: usize, num_outputs: usize, l2_reg_lambda: f64) -> SoftmaxModel {
        SoftmaxModel {
            w: Array2::zeros((num_inputs, num_outputs)),
            grad: Array2::zeros((num_inputs, num_outputs)),
            l2_reg_lambda,
        }
    }

    /// Construct the model with the given weight initialization
    pub fn with_init<R: Rng>(l2_reg_lambda: f64, init: InitMethod, rng: &mut R) -> SoftmaxModel {
        let mut model = SoftmaxModel::new(l2_reg_lambda);

        if init == InitMethod::Uniform {
            // Weights are drawn from U(-1/sqrt(fan_in), 1/sqrt(fan_in))
            let boundary = (model.w.nrows() as f64).sqrt().recip();
            let distribution = Uniform::new_inclusive(-boundary, boundary);
            model.w.mapv_inplace(|_| distribution.sample(&mut *rng));
        }

        model
    }

    pub fn num_inputs(&self) -> usize {
        self.w.nrows()
    }

    pub fn num_outputs(&self) -> usize {
        self.w.ncols()
    }

    /// lambda * sum(W^2)
    pub fn l2_penalty(&self) -> f64 {
        self.l2_reg_lambda * self.w.iter().map(|x| x * x).sum::<f64>()
    }

    pub fn frobenius_norm(&self) -> f64 {
        self.w.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Matrix 2-norm of the weights (largest singular value)
    pub fn spectral_norm(&self) -> f64 {
        spectral_norm(&self.w.view())
    }

    fn check_inputs(&self, context: &'static str, inputs: &ArrayView2<f64>) -> Result<()> {
        if inputs.ncols() != self.num_inputs() {
            return Err(SoftmaxError::ShapeMismatch {
                context,
                expected: (inputs.nrows(), self.num_inputs()),
                found: inputs.dim(),
            });
        }

        Ok(())
    }
}

impl Model for SoftmaxModel {
    fn forward(&self, inputs: &ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_inputs("forward", inputs)?;

        let mut predictions = inputs.dot(&self.w);
        for row in predictions.axis_iter_mut(Axis(0)) {
            softmax(row);
        }

        Ok(predictions)
    }

    fn backward(
        &mut self,
        inputs: &ArrayView2<f64>,
        outputs: &ArrayView2<f64>,
        targets: &ArrayView2<f64>,
    ) -> Result<()> {
        self.check_inputs("backward", inputs)?;

        let expected = (inputs.nrows(), self.num_outputs());
        for (context, found) in [
            ("backward outputs", outputs.dim()),
            ("backward targets", targets.dim()),
        ] {
            if found != expected {
                return Err(SoftmaxError::ShapeMismatch {
                    context,
                    expected,
                    found,
                });
            }
        }
        if inputs.nrows() == 0 {
            return Err(SoftmaxError::EmptyDataset);
        }

        // For softmax + cross-entropy the gradient WRT the logits is simply outputs - targets
        let delta = outputs - targets;
        self.grad = inputs.t().dot(&delta) / inputs.nrows() as f64;
        if self.l2_reg_lambda != 0f64 {
            self.grad.scaled_add(2f64 * self.l2_reg_lambda, &self.w);
        }

        Ok(())
    }

    fn apply_gradient(&mut self, learning_rate: f64) {
        self.w.scaled_add(-learning_rate, &self.grad);
    }

    fn penalty(&self) -> f64 {
        self.l2_penalty()
    }
}

/// Softmax function - Convert a row of scores into a probability distribution in place
pub fn softmax(mut scores: ArrayViewMut1<f64>) {
    let max = scores.fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));
    // Shifting by the max keeps exp() from overflowing to inf for large scores
    scores.mapv_inplace(|x| (x - max).exp());
    let sum = scores.sum();
    scores.mapv_inplace(|x| x / sum);
}

/// Largest singular value of `matrix`, by power iteration on M^T M
pub fn spectral_norm(matrix: &ArrayView2<f64>) -> f64 {
    let gram = matrix.t().dot(matrix);
    let n = gram.nrows();
    if n == 0 {
        return 0f64;
    }

    // Distinct entries so the start vector isn't orthogonal to a structured eigenvector
    let mut v: Array1<f64> = (0..n).map(|i| 1f64 + i as f64 / n as f64).collect();
    let start_norm = v.dot(&v).sqrt();
    v /= start_norm;
    let mut eigenvalue = 0f64;

    for _ in 0..POWER_ITERATIONS {
        let next = gram.dot(&v);
        let norm = next.dot(&next).sqrt();
        if norm == 0f64 {
            return 0f64;
        }

        v = next / norm;
        let converged = (norm - eigenvalue).abs() <= POWER_TOLERANCE * norm;
        eigenvalue = norm;
        if converged {
            break;
        }
    }

    eigenvalue.sqrt()
}
