use ndarray::{s, Array2, ArrayView2};

use crate::error::{Result, SoftmaxError};

pub mod idx;
pub mod mnist;

/// Pixels per image (28x28)
pub const NUM_FEATURES: usize = 784;
/// Pixels per image plus the constant bias feature
pub const NUM_INPUTS: usize = NUM_FEATURES + 1;
pub const NUM_CLASSES: usize = 10;
pub const IMAGE_SIDE: usize = 28;
const GREYSCALE_SIZE: f64 = 255f64;

/// Images and integer labels exactly as they come out of a dataset file.
/// Pixels are in 0..=255.
#[derive(Debug, Clone)]
pub struct RawSplit {
    pub images: Array2<f64>,
    pub labels: Vec<usize>,
}

impl RawSplit {
    /// Keep at most the first `limit` samples
    pub fn truncate(mut self, limit: Option<usize>) -> RawSplit {
        if let Some(limit) = limit {
            if limit < self.labels.len() {
                self.images = self.images.slice(s![..limit, ..]).to_owned();
                self.labels.truncate(limit);
            }
        }

        self
    }
}

/// A preprocessed split: `data` is [N, 785] (bias column last), `target` is one-hot [N, 10]
#[derive(Debug, Clone)]
pub struct Dataset {
    pub data: Array2<f64>,
    pub target: Array2<f64>,
}

impl Dataset {
    /// Normalize the images, add the bias column and one-hot encode the labels
    pub fn from_raw(raw: &RawSplit, num_classes: usize) -> Result<Dataset> {
        if raw.labels.is_empty() {
            return Err(SoftmaxError::EmptyDataset);
        }
        if raw.images.nrows() != raw.labels.len() {
            return Err(SoftmaxError::ShapeMismatch {
                context: "dataset labels",
                expected: (raw.images.nrows(), 1),
                found: (raw.labels.len(), 1),
            });
        }

        Ok(Dataset {
            data: pre_process_images(&raw.images.view()),
            target: one_hot_encode(&raw.labels, num_classes)?,
        })
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }
}

/// The four arrays a training run needs
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Dataset,
    pub validation: Dataset,
}

impl DatasetSplit {
    pub fn from_raw(train: &RawSplit, validation: &RawSplit) -> Result<DatasetSplit> {
        Ok(DatasetSplit {
            train: Dataset::from_raw(train, NUM_CLASSES)?,
            validation: Dataset::from_raw(validation, NUM_CLASSES)?,
        })
    }
}

/// Map pixels from [0, 255] onto [-1, 1] and append a column of ones for the bias
pub fn pre_process_images(images: &ArrayView2<f64>) -> Array2<f64> {
    let (rows, cols) = images.dim();
    let mut processed = Array2::ones((rows, cols + 1));

    processed
        .slice_mut(s![.., ..cols])
        .assign(&images.mapv(|x| x / (GREYSCALE_SIZE / 2f64) - 1f64));

    processed
}

/// Construct the one-hot encoding of every label
pub fn one_hot_encode(labels: &[usize], num_classes: usize) -> Result<Array2<f64>> {
    let mut encoded = Array2::zeros((labels.len(), num_classes));

    for (row, &label) in labels.iter().enumerate() {
        if label >= num_classes {
            return Err(SoftmaxError::InvalidLabel { label, num_classes });
        }
        encoded[[row, label]] = 1f64;
    }

    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Axis};

    #[test]
    fn test_pre_process_range_and_bias() {
        let images = array![[0.0, 127.5, 255.0], [255.0, 0.0, 51.0]];
        let processed = pre_process_images(&images.view());

        assert_eq!(processed.dim(), (2, 4));
        assert_relative_eq!(processed[[0, 0]], -1.0);
        assert_relative_eq!(processed[[0, 1]], 0.0);
        assert_relative_eq!(processed[[0, 2]], 1.0);
        assert_relative_eq!(processed[[1, 2]], -0.6, epsilon = 1e-12);
        assert!(processed.column(3).iter().all(|&b| b == 1.0));
    }

    #[test]
    fn test_one_hot_rows_sum_to_one() {
        let encoded = one_hot_encode(&[3, 0, 9, 3], 10).unwrap();

        assert_eq!(encoded.dim(), (4, 10));
        assert_eq!(encoded[[0, 3]], 1.0);
        assert_eq!(encoded[[2, 9]], 1.0);
        for sum in encoded.sum_axis(Axis(1)) {
            assert_eq!(sum, 1.0);
        }
    }

    #[test]
    fn test_one_hot_rejects_out_of_range() {
        let err = one_hot_encode(&[1, 10], 10).unwrap_err();
        assert!(matches!(
            err,
            SoftmaxError::InvalidLabel {
                label: 10,
                num_classes: 10
            }
        ));
    }

    #[test]
    fn test_truncate_keeps_prefix() {
        let raw = RawSplit {
            images: Array2::from_shape_fn((5, 2), |(i, _)| i as f64),
            labels: vec![0, 1, 2, 3, 4],
        };
        let raw = raw.truncate(Some(3));

        assert_eq!(raw.images.nrows(), 3);
        assert_eq!(raw.labels, vec![0, 1, 2]);
        assert_eq!(raw.clone().truncate(Some(10)).labels.len(), 3);
        assert_eq!(raw.truncate(None).labels.len(), 3);
    }

    #[test]
    fn test_from_raw_rejects_empty() {
        let raw = RawSplit {
            images: Array2::zeros((0, NUM_FEATURES)),
            labels: vec![],
        };
        assert!(matches!(
            Dataset::from_raw(&raw, NUM_CLASSES),
            Err(SoftmaxError::EmptyDataset)
        ));
    }
}
