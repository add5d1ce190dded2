//! Everything written after training: console summary, weight images,
//! exported histories and plots.

use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::experiment::{ExperimentResults, RunResult};

pub mod export;
pub mod plot;
pub mod weights;

use plot::{line_plot, Series};

/// Train loss is averaged over this many steps before plotting
const LOSS_POINTS_TO_AVERAGE: usize = 10;

/// Print the final loss and accuracy of a run
pub fn print_summary(run: &RunResult) {
    println!("[{}] lambda = {}", run.name, run.lambda);
    println!("Final Train Cross Entropy Loss: {}", run.metrics.train_loss);
    println!("Final Validation Cross Entropy Loss: {}", run.metrics.val_loss);
    println!("Final Train accuracy: {}", run.metrics.train_accuracy);
    println!("Final Validation accuracy: {}", run.metrics.val_accuracy);
}

/// Loss and accuracy plots of a single run
fn plot_run(output_dir: &Path, run: &RunResult) -> Result<()> {
    let loss_path = output_dir.join(format!("{}_train_loss.png", run.name));
    line_plot(
        &loss_path,
        &format!("{} (lambda = {})", run.name, run.lambda),
        "Number of Training Steps",
        "Cross Entropy Loss - Average",
        &[
            Series::averaged("Training Loss", &run.train_history.loss, LOSS_POINTS_TO_AVERAGE),
            Series::new("Validation Loss", &run.val_history.loss),
        ],
    )?;

    let accuracy_path = output_dir.join(format!("{}_train_accuracy.png", run.name));
    line_plot(
        &accuracy_path,
        &format!("{} (lambda = {})", run.name, run.lambda),
        "Number of Training Steps",
        "Accuracy",
        &[
            Series::new("Training Accuracy", &run.train_history.accuracy),
            Series::new("Validation Accuracy", &run.val_history.accuracy),
        ],
    )?;

    debug!(run = %run.name, "wrote run plots");

    Ok(())
}

/// Weight tiles of the baseline and regularized models, separately and stacked
fn write_weight_images(output_dir: &Path, results: &ExperimentResults) -> Result<()> {
    let unregularized = weights::normalize(&weights::weight_tiles(&results.baseline.model.w.view())?.view());
    let regularized = weights::normalize(&weights::weight_tiles(&results.regularized.model.w.view())?.view());

    weights::save_gray(&output_dir.join("weights_unregularized.png"), &unregularized.view())?;
    weights::save_gray(&output_dir.join("weights_regularized.png"), &regularized.view())?;

    let comparison = weights::stack_vertical(&unregularized.view(), &regularized.view())?;
    weights::save_gray(&output_dir.join("softmax_weight.png"), &comparison.view())?;

    Ok(())
}

fn plot_sweep(output_dir: &Path, results: &ExperimentResults) -> Result<()> {
    let accuracies: Vec<Series> = results
        .sweep
        .iter()
        .map(|run| Series::new(format!("L2_lambda = {}", run.lambda), &run.val_history.accuracy))
        .collect();
    line_plot(
        &output_dir.join("l2_reg_accuracy.png"),
        "Validation accuracy per L2 lambda",
        "Number of Training Steps",
        "Accuracy",
        &accuracies,
    )?;

    let norms = Series {
        label: "Weight L2 norm".to_owned(),
        points: results
            .sweep
            .iter()
            .map(|run| (run.lambda, run.weight_norm()))
            .collect(),
        band: Vec::new(),
    };
    line_plot(
        &output_dir.join("l2_reg_norms.png"),
        "Weight norm against L2 lambda",
        "Lambda",
        "L2 Norm",
        &[norms],
    )
}

/// Write every report file into `output_dir`, creating it if needed
pub fn write_report(output_dir: &Path, results: &ExperimentResults) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    write_weight_images(output_dir, results)?;

    for run in std::iter::once(&results.baseline)
        .chain(std::iter::once(&results.regularized))
        .chain(&results.sweep)
    {
        let path = output_dir.join(format!("history_{}.csv", run.name));
        export::write_history(&path, &run.train_history, &run.val_history)?;
    }
    export::write_summary(&output_dir.join("summary.json"), results)?;

    plot_run(output_dir, &results.baseline)?;
    plot_run(output_dir, &results.regularized)?;
    plot_sweep(output_dir, results)?;

    info!(dir = %output_dir.display(), "report written");

    Ok(())
}
