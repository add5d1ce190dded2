use super::{RawSplit, NUM_CLASSES, NUM_FEATURES};
use crate::error::{Result, SoftmaxError};
use csv::StringRecord;
use ndarray::Array2;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

const LINE_SIZE: usize = NUM_FEATURES + 1;
const MAX_PIXEL: f64 = 255f64;

/// Parse every field of a record into a `T`.
fn parse_fields<T: FromStr>(record: &StringRecord, line: u64) -> Result<Vec<T>> {
    record
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            T::from_str(field.trim()).map_err(|_| SoftmaxError::Parse {
                line,
                message: format!("field {} is not a number: {:?}", idx, field),
            })
        })
        .collect()
}

/// Parse a record of the dataset. Returns the pixels and the label.
/// Records are stored as <label>,<pixel0x0>,<pixel0x1>,...
/// (the layout of https://www.kaggle.com/datasets/oddrationale/mnist-in-csv)
fn parse_dataset_record(record: &StringRecord, line: u64) -> Result<(Vec<f64>, usize)> {
    if record.len() != LINE_SIZE {
        return Err(SoftmaxError::Parse {
            line,
            message: format!("expected {} fields, found {}", LINE_SIZE, record.len()),
        });
    }

    let values: Vec<f64> = parse_fields(record, line)?;
    let label = values[0];
    if label < 0f64 || label.fract() != 0f64 {
        return Err(SoftmaxError::Parse {
            line,
            message: format!("label {} is not a class index", label),
        });
    }
    if label >= NUM_CLASSES as f64 {
        return Err(SoftmaxError::Parse {
            line,
            message: format!("label {} outside 0..{}", label, NUM_CLASSES),
        });
    }
    if let Some(pixel) = values[1..].iter().find(|p| !(0f64..=MAX_PIXEL).contains(*p)) {
        return Err(SoftmaxError::Parse {
            line,
            message: format!("pixel value {} outside 0..=255", pixel),
        });
    }

    Ok((values[1..].to_vec(), label as usize))
}

/// Parse a CSV dataset with a header line from any reader
pub fn parse_reader<R: Read>(reader: R, limit: Option<usize>) -> Result<RawSplit> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let mut pixels = Vec::new();
    let mut labels = Vec::new();

    for record in reader.records() {
        if limit.is_some_and(|limit| labels.len() >= limit) {
            break;
        }

        let record = record?;
        // Trailing blank lines end the dataset
        if record.len() == 1 && record[0].trim().is_empty() {
            break;
        }
        let line = record.position().map_or(0, |pos| pos.line());
        let (row, label) = parse_dataset_record(&record, line)?;

        pixels.extend(row);
        labels.push(label);
    }

    let images = Array2::from_shape_vec((labels.len(), NUM_FEATURES), pixels).map_err(|_| {
        SoftmaxError::ShapeMismatch {
            context: "csv dataset",
            expected: (labels.len(), NUM_FEATURES),
            found: (labels.len(), 0),
        }
    })?;

    Ok(RawSplit { images, labels })
}

/// Return the raw images and labels stored in a CSV file
pub fn parse_dataset(path: impl AsRef<Path>, limit: Option<usize>) -> Result<RawSplit> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let raw = parse_reader(file, limit)?;

    debug!(path = %path.display(), samples = raw.labels.len(), "parsed CSV dataset");

    Ok(raw)
}
