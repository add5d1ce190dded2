use json::{object, JsonValue};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::experiment::{ExperimentResults, FinalMetrics, RunResult};
use crate::training::History;

/// One row of a history CSV
#[derive(Debug, Serialize)]
struct HistoryRecord<'a> {
    series: &'a str,
    step: usize,
    value: f64,
}

/// Write both histories of a run as `series,step,value` rows
pub fn write_history(path: &Path, train: &History, validation: &History) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    for (series, points) in [
        ("train_loss", &train.loss),
        ("train_accuracy", &train.accuracy),
        ("val_loss", &validation.loss),
        ("val_accuracy", &validation.accuracy),
    ] {
        for &(step, value) in points {
            writer.serialize(HistoryRecord {
                series,
                step,
                value,
            })?;
        }
    }

    writer.flush()?;

    Ok(())
}

fn metrics_json(metrics: &FinalMetrics) -> JsonValue {
    let mut data = object! {};

    data["train_loss"] = metrics.train_loss.into();
    data["val_loss"] = metrics.val_loss.into();
    data["train_accuracy"] = metrics.train_accuracy.into();
    data["val_accuracy"] = metrics.val_accuracy.into();

    data
}

fn run_json(run: &RunResult) -> JsonValue {
    let mut data = object! {};

    data["name"] = run.name.as_str().into();
    data["lambda"] = run.lambda.into();
    data["weight_norm"] = run.weight_norm().into();
    data["metrics"] = metrics_json(&run.metrics);

    data
}

/// Build the JSON summary of final metrics and sweep norms
pub fn summary_json(results: &ExperimentResults) -> JsonValue {
    let mut data = object! {};

    data["baseline"] = run_json(&results.baseline);
    data["regularized"] = run_json(&results.regularized);
    data["sweep"] = results.sweep.iter().map(run_json).collect::<Vec<_>>().into();

    data
}

pub fn write_summary(path: &Path, results: &ExperimentResults) -> Result<()> {
    fs::write(path, summary_json(results).pretty(2))?;
    Ok(())
}
