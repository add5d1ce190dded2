// End-to-end runs on a synthetic MNIST-shaped dataset: every class lights up
// its own band of pixels, so the classes are linearly separable.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use softmax_mnist::experiment::{self, ExperimentConfig};
use softmax_mnist::model::metrics::calculate_accuracy;
use softmax_mnist::parsing::{DatasetSplit, RawSplit, NUM_CLASSES, NUM_FEATURES};
use softmax_mnist::report::{self, export, weights};
use softmax_mnist::{Model, SoftmaxModel, Trainer, TrainerConfig};

const BAND: usize = NUM_FEATURES / NUM_CLASSES;

fn synthetic(n: usize, seed: u64) -> RawSplit {
    let mut rng = StdRng::seed_from_u64(seed);
    let labels: Vec<usize> = (0..n).map(|i| i % NUM_CLASSES).collect();
    let images = Array2::from_shape_fn((n, NUM_FEATURES), |(i, pixel)| {
        let lit = pixel / BAND == labels[i];
        let base = if lit { 200.0 } else { 20.0 };
        base + rng.gen_range(0.0..50.0)
    });

    RawSplit { images, labels }
}

fn data() -> DatasetSplit {
    DatasetSplit::from_raw(&synthetic(200, 1), &synthetic(100, 2)).unwrap()
}

fn config() -> ExperimentConfig {
    ExperimentConfig {
        trainer: TrainerConfig {
            num_epochs: 3,
            learning_rate: 0.05,
            batch_size: 20,
            ..TrainerConfig::default()
        },
        ..ExperimentConfig::default()
    }
}

#[test]
fn test_preprocessed_shapes() {
    let data = data();

    assert_eq!(data.train.data.dim(), (200, 785));
    assert_eq!(data.train.target.dim(), (200, 10));
    assert_eq!(data.validation.data.dim(), (100, 785));
    assert!(data.train.data.column(784).iter().all(|&b| b == 1.0));
}

#[test]
fn test_unregularized_model_learns() {
    let data = data();
    let mut model = SoftmaxModel::new(0.0);
    let before = calculate_accuracy(&data.validation.data.view(), &data.validation.target.view(), &model).unwrap();

    let config = config().trainer;
    let (train, val) = Trainer::new(&mut model, &data, config).unwrap().train().unwrap();

    let after = calculate_accuracy(&data.validation.data.view(), &data.validation.target.view(), &model).unwrap();
    assert!(after > 0.9, "validation accuracy {after}");
    assert!(after > before);
    assert_eq!(train.loss.len(), 30);
    // 10 batches per epoch and 5 validations per epoch: a validation every 2 steps
    assert_eq!(val.accuracy.len(), 15);
    assert_eq!(val.accuracy[14].0, 28);

    let outputs = model.forward(&data.validation.data.view()).unwrap();
    for row in outputs.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_experiment_runs_and_norm_shrinks_with_lambda() {
    let data = data();
    let results = experiment::run(&data, &config()).unwrap();

    assert_eq!(results.baseline.lambda, 0.0);
    assert_eq!(results.regularized.lambda, 1.0);
    assert!(results.regularized.weight_norm() < results.baseline.weight_norm());
    assert!(results.baseline.metrics.val_accuracy > 0.9);

    // lambdas are 1, 0.1, 0.01, 0.001: the norm should not decrease along the sweep
    let norms: Vec<f64> = results.sweep.iter().map(|run| run.weight_norm()).collect();
    assert_eq!(norms.len(), 4);
    for pair in norms.windows(2) {
        assert!(pair[0] <= pair[1] + 1e-9, "norms {norms:?}");
    }

    let summary = export::summary_json(&results);
    assert_eq!(summary["sweep"].len(), 4);
    assert_eq!(summary["regularized"]["lambda"].as_f64(), Some(1.0));
    assert!(summary["baseline"]["metrics"]["val_accuracy"].as_f64().unwrap() > 0.9);
}

#[test]
fn test_exports_weight_images_and_history() {
    let data = data();
    let results = experiment::run(
        &data,
        &ExperimentConfig {
            lambdas: vec![0.1],
            ..config()
        },
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let top = weights::normalize(&weights::weight_tiles(&results.baseline.model.w.view()).unwrap().view());
    let bottom = weights::normalize(&weights::weight_tiles(&results.regularized.model.w.view()).unwrap().view());
    let stacked = weights::stack_vertical(&top.view(), &bottom.view()).unwrap();
    let path = dir.path().join("softmax_weight.png");
    weights::save_gray(&path, &stacked.view()).unwrap();

    let image = image::open(&path).unwrap().to_luma8();
    assert_eq!(image.dimensions(), (280, 56));

    let history_path = dir.path().join("history_softmax.csv");
    export::write_history(
        &history_path,
        &results.baseline.train_history,
        &results.baseline.val_history,
    )
    .unwrap();
    let rows = std::fs::read_to_string(&history_path).unwrap().lines().count();
    let baseline = &results.baseline;
    let expected = 1
        + baseline.train_history.loss.len()
        + baseline.train_history.accuracy.len()
        + baseline.val_history.loss.len()
        + baseline.val_history.accuracy.len();
    assert_eq!(rows, expected);

    let summary_path = dir.path().join("summary.json");
    export::write_summary(&summary_path, &results).unwrap();
    let parsed = json::parse(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
    let lambda = parsed["sweep"][0]["lambda"].as_f64().unwrap();
    assert!((lambda - 0.1).abs() < 1e-12);
}

#[test]
fn test_write_report_creates_every_file() {
    let data = data();
    let results = experiment::run(
        &data,
        &ExperimentConfig {
            lambdas: vec![0.1, 0.01],
            ..config()
        },
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("report");
    report::write_report(&output_dir, &results).unwrap();

    for name in [
        "softmax_train_loss.png",
        "softmax_train_accuracy.png",
        "softmax_l2_train_loss.png",
        "softmax_l2_train_accuracy.png",
        "weights_unregularized.png",
        "weights_regularized.png",
        "softmax_weight.png",
        "l2_reg_accuracy.png",
        "l2_reg_norms.png",
        "history_softmax.csv",
        "history_softmax_l2.csv",
        "history_lambda_0.1.csv",
        "history_lambda_0.01.csv",
        "summary.json",
    ] {
        let path = output_dir.join(name);
        assert!(path.is_file(), "missing {}", path.display());
    }

    let plot = image::open(output_dir.join("l2_reg_norms.png")).unwrap().to_luma8();
    assert_eq!(plot.dimensions(), (1024, 768));
}
