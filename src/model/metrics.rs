//! Loss and accuracy over whole sets of predictions.

use ndarray::{ArrayView1, ArrayView2, Axis};

use super::Model;
use crate::error::Result;

/// Probabilities are clamped to this before taking the log, so that a zero
/// probability on a non-target class contributes 0 instead of NaN.
const MIN_PROBABILITY: f64 = 1e-12;

/// Cross-entropy loss: -mean(sum(targets * ln(outputs), axis=1))
pub fn cross_entropy_loss(targets: &ArrayView2<f64>, outputs: &ArrayView2<f64>) -> f64 {
    if outputs.nrows() == 0 {
        return 0f64;
    }

    let total: f64 = outputs
        .axis_iter(Axis(0))
        .zip(targets.axis_iter(Axis(0)))
        .map(|(output_row, target_row)| {
            target_row.dot(&output_row.mapv(|p| p.max(MIN_PROBABILITY).ln()))
        })
        .sum();

    -total / outputs.nrows() as f64
}

/// Index of the largest entry; the first one wins ties
pub fn argmax(row: &ArrayView1<f64>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best_idx, best), (idx, &x)| {
            if x > best {
                (idx, x)
            } else {
                (best_idx, best)
            }
        })
        .0
}

/// Fraction of rows where argmax(outputs) == argmax(targets)
pub fn accuracy(outputs: &ArrayView2<f64>, targets: &ArrayView2<f64>) -> f64 {
    let total = targets.nrows();
    if total == 0 {
        return 0f64;
    }

    let correct = outputs
        .axis_iter(Axis(0))
        .zip(targets.axis_iter(Axis(0)))
        .filter(|(output_row, target_row)| argmax(output_row) == argmax(target_row))
        .count();

    correct as f64 / total as f64
}

/// Accuracy of `model` over a full set of inputs
pub fn calculate_accuracy<M: Model>(
    inputs: &ArrayView2<f64>,
    targets: &ArrayView2<f64>,
    model: &M,
) -> Result<f64> {
    let outputs = model.forward(inputs)?;
    Ok(accuracy(&outputs.view(), targets))
}

/// Cross-entropy of `model` over a full set of inputs
pub fn calculate_loss<M: Model>(
    inputs: &ArrayView2<f64>,
    targets: &ArrayView2<f64>,
    model: &M,
) -> Result<f64> {
    let outputs = model.forward(inputs)?;
    Ok(cross_entropy_loss(targets, &outputs.view()))
}
