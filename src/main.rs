use anyhow::{bail, Context};
use clap::Parser;
use softmax_mnist::experiment::{self, ExperimentConfig};
use softmax_mnist::model::softmax::InitMethod;
use softmax_mnist::parsing::{idx, mnist, DatasetSplit, RawSplit};
use softmax_mnist::report;
use softmax_mnist::training::TrainerConfig;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DatasetFormat {
    /// `label,pixel0,...,pixel783` records with a header line
    Csv,
    /// The IDX image/label file pairs MNIST is distributed as
    Idx,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Format of the dataset files
    #[arg(short, long, value_enum, default_value_t = DatasetFormat::Csv)]
    format: DatasetFormat,

    /// The path of the training dataset (CSV)
    #[arg(short, long)]
    train_path: Option<PathBuf>,

    /// The path of the validation dataset (CSV)
    #[arg(short, long)]
    validation_path: Option<PathBuf>,

    /// Training images (IDX)
    #[arg(long)]
    train_images: Option<PathBuf>,

    /// Training labels (IDX)
    #[arg(long)]
    train_labels: Option<PathBuf>,

    /// Validation images (IDX)
    #[arg(long)]
    validation_images: Option<PathBuf>,

    /// Validation labels (IDX)
    #[arg(long)]
    validation_labels: Option<PathBuf>,

    /// Only use the first N training samples
    #[arg(long)]
    train_limit: Option<usize>,

    /// Only use the first N validation samples
    #[arg(long)]
    validation_limit: Option<usize>,

    /// Number of epochs to train every model for
    #[arg(short, long, default_value_t = 50)]
    num_epochs: usize,

    /// Learning rate of the GD steps
    #[arg(short, long, default_value_t = 0.01)]
    learning_rate: f64,

    /// Batch size
    #[arg(short, long, default_value_t = 128)]
    batch_size: usize,

    /// Keep the sample order fixed instead of reshuffling every epoch
    #[arg(long)]
    no_shuffle: bool,

    /// Validation steps per epoch
    #[arg(long, default_value_t = 5)]
    validations_per_epoch: usize,

    /// Seed for shuffling and weight initialization
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// L2 strength of the regularized comparison model
    #[arg(long, default_value_t = 1.0)]
    l2_lambda: f64,

    /// L2 strengths to sweep, e.g. "1 0.1 0.01 0.001"
    #[arg(long, num_args = 1.., value_delimiter = ' ', default_values_t = [1.0, 0.1, 0.01, 0.001])]
    lambdas: Vec<f64>,

    /// Weight initialization method
    #[arg(short, long, value_enum, default_value_t = InitMethod::Zeros)]
    init: InitMethod,

    /// Include the L2 penalty in the reported losses
    #[arg(long)]
    penalty_in_loss: bool,

    /// Directory the images, plots and exports are written to
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long)]
    verbose: bool,
}

fn required<'a>(path: &'a Option<PathBuf>, flag: &str) -> anyhow::Result<&'a Path> {
    match path {
        Some(path) => Ok(path.as_path()),
        None => bail!("--{} is required for this dataset format", flag),
    }
}

/// Read the train and validation splits in the requested format
fn load_raw(args: &Args) -> anyhow::Result<(RawSplit, RawSplit)> {
    let splits = match args.format {
        DatasetFormat::Csv => {
            let train_path = required(&args.train_path, "train-path")?;
            let validation_path = required(&args.validation_path, "validation-path")?;
            (
                mnist::parse_dataset(train_path, args.train_limit)
                    .with_context(|| format!("reading {}", train_path.display()))?,
                mnist::parse_dataset(validation_path, args.validation_limit)
                    .with_context(|| format!("reading {}", validation_path.display()))?,
            )
        }
        DatasetFormat::Idx => (
            idx::parse_dataset(
                required(&args.train_images, "train-images")?,
                required(&args.train_labels, "train-labels")?,
                args.train_limit,
            )
            .context("reading the IDX training set")?,
            idx::parse_dataset(
                required(&args.validation_images, "validation-images")?,
                required(&args.validation_labels, "validation-labels")?,
                args.validation_limit,
            )
            .context("reading the IDX validation set")?,
        ),
    };

    Ok(splits)
}

fn experiment_config(args: &Args) -> ExperimentConfig {
    ExperimentConfig {
        trainer: TrainerConfig {
            num_epochs: args.num_epochs,
            learning_rate: args.learning_rate,
            batch_size: args.batch_size,
            shuffle: !args.no_shuffle,
            validations_per_epoch: args.validations_per_epoch,
            penalty_in_loss: args.penalty_in_loss,
            seed: args.seed,
            ..TrainerConfig::default()
        },
        regularized_lambda: args.l2_lambda,
        lambdas: args.lambdas.clone(),
        init: args.init,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (train, validation) = load_raw(&args)?;
    let data = DatasetSplit::from_raw(&train, &validation).context("preprocessing the dataset")?;
    info!(
        train = data.train.len(),
        validation = data.validation.len(),
        "loaded dataset"
    );

    let config = experiment_config(&args);
    let results = experiment::run(&data, &config).context("training")?;

    report::print_summary(&results.baseline);
    report::print_summary(&results.regularized);
    for run in &results.sweep {
        println!(
            "lambda = {}: weight norm {:.4}, final validation accuracy {:.4}",
            run.lambda,
            run.weight_norm(),
            run.metrics.val_accuracy
        );
    }

    report::write_report(&args.output_dir, &results)
        .with_context(|| format!("writing the report to {}", args.output_dir.display()))?;

    Ok(())
}
