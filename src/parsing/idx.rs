//! Reader for the IDX binary files MNIST is originally distributed in.
//!
//! ```text
//! images (IDX3): 0x00 0x00 0x08 0x03 | N u32 BE | rows u32 BE | cols u32 BE | N*rows*cols u8
//! labels (IDX1): 0x00 0x00 0x08 0x01 | N u32 BE | N u8
//! ```

use super::{RawSplit, NUM_FEATURES};
use crate::error::{Result, SoftmaxError};
use ndarray::Array2;
use std::fs;
use std::path::Path;
use tracing::debug;

const IMAGE_MAGIC: u32 = 0x0000_0803;
const LABEL_MAGIC: u32 = 0x0000_0801;
const IMAGE_HEADER_LEN: usize = 16;
const LABEL_HEADER_LEN: usize = 8;

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Decode an IDX3 image file into a [N, rows * cols] matrix of raw pixel values
pub fn parse_images(bytes: &[u8]) -> Result<Array2<f64>> {
    if bytes.len() < IMAGE_HEADER_LEN {
        return Err(SoftmaxError::Idx(format!(
            "image file too short: {} bytes",
            bytes.len()
        )));
    }

    let magic = read_u32(bytes, 0);
    if magic != IMAGE_MAGIC {
        return Err(SoftmaxError::Idx(format!(
            "bad image magic 0x{:08X}, expected 0x{:08X}",
            magic, IMAGE_MAGIC
        )));
    }

    let count = read_u32(bytes, 4) as usize;
    let rows = read_u32(bytes, 8) as usize;
    let cols = read_u32(bytes, 12) as usize;
    let pixels_per_image = rows
        .checked_mul(cols)
        .ok_or_else(|| SoftmaxError::Idx(format!("{}x{} images overflow", rows, cols)))?;
    if pixels_per_image != NUM_FEATURES {
        return Err(SoftmaxError::Idx(format!(
            "expected {} pixels per image, file has {}x{}",
            NUM_FEATURES, rows, cols
        )));
    }

    let body = &bytes[IMAGE_HEADER_LEN..];
    let expected = count * pixels_per_image;
    if body.len() < expected {
        return Err(SoftmaxError::Idx(format!(
            "image file truncated: header promises {} images, body holds {} bytes",
            count,
            body.len()
        )));
    }

    let pixels: Vec<f64> = body[..expected].iter().map(|&p| p as f64).collect();

    Array2::from_shape_vec((count, pixels_per_image), pixels)
        .map_err(|e| SoftmaxError::Idx(e.to_string()))
}

/// Decode an IDX1 label file
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<usize>> {
    if bytes.len() < LABEL_HEADER_LEN {
        return Err(SoftmaxError::Idx(format!(
            "label file too short: {} bytes",
            bytes.len()
        )));
    }

    let magic = read_u32(bytes, 0);
    if magic != LABEL_MAGIC {
        return Err(SoftmaxError::Idx(format!(
            "bad label magic 0x{:08X}, expected 0x{:08X}",
            magic, LABEL_MAGIC
        )));
    }

    let count = read_u32(bytes, 4) as usize;
    let body = &bytes[LABEL_HEADER_LEN..];
    if body.len() < count {
        return Err(SoftmaxError::Idx(format!(
            "label file truncated: header promises {} labels, body holds {}",
            count,
            body.len()
        )));
    }

    Ok(body[..count].iter().map(|&l| l as usize).collect())
}

/// Load a matching pair of image and label files
pub fn parse_dataset(
    images_path: impl AsRef<Path>,
    labels_path: impl AsRef<Path>,
    limit: Option<usize>,
) -> Result<RawSplit> {
    let images = parse_images(&fs::read(images_path.as_ref())?)?;
    let labels = parse_labels(&fs::read(labels_path.as_ref())?)?;

    if images.nrows() != labels.len() {
        return Err(SoftmaxError::Idx(format!(
            "{} images but {} labels",
            images.nrows(),
            labels.len()
        )));
    }

    debug!(
        images = %images_path.as_ref().display(),
        samples = labels.len(),
        "parsed IDX dataset"
    );

    Ok(RawSplit { images, labels }.truncate(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_file(count: u32, rows: u32, cols: u32, fill: u8) -> Vec<u8> {
        let mut bytes = IMAGE_MAGIC.to_be_bytes().to_vec();
        bytes.extend(count.to_be_bytes());
        bytes.extend(rows.to_be_bytes());
        bytes.extend(cols.to_be_bytes());
        bytes.extend(std::iter::repeat(fill).take((count * rows * cols) as usize));
        bytes
    }

    fn label_file(labels: &[u8]) -> Vec<u8> {
        let mut bytes = LABEL_MAGIC.to_be_bytes().to_vec();
        bytes.extend((labels.len() as u32).to_be_bytes());
        bytes.extend(labels);
        bytes
    }

    #[test]
    fn test_parse_images() {
        let images = parse_images(&image_file(3, 28, 28, 200)).unwrap();

        assert_eq!(images.dim(), (3, NUM_FEATURES));
        assert!(images.iter().all(|&p| p == 200.0));
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!(parse_labels(&label_file(&[5, 0, 4])).unwrap(), vec![5, 0, 4]);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = image_file(1, 28, 28, 0);
        bytes[3] = 0x01;
        assert!(matches!(parse_images(&bytes), Err(SoftmaxError::Idx(_))));
        assert!(matches!(
            parse_labels(&image_file(1, 28, 28, 0)),
            Err(SoftmaxError::Idx(_))
        ));
    }

    #[test]
    fn test_rejects_truncated_and_wrong_size() {
        let mut bytes = image_file(2, 28, 28, 0);
        bytes.truncate(bytes.len() - 1);
        assert!(parse_images(&bytes).is_err());
        assert!(parse_images(&image_file(1, 32, 32, 0)).is_err());

        let mut labels = label_file(&[1, 2, 3]);
        labels.pop();
        assert!(parse_labels(&labels).is_err());
    }

    #[test]
    fn test_parse_dataset_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let images_path = dir.path().join("images.idx3-ubyte");
        let labels_path = dir.path().join("labels.idx1-ubyte");
        fs::write(&images_path, image_file(4, 28, 28, 1)).unwrap();
        fs::write(&labels_path, label_file(&[1, 2, 3, 4])).unwrap();

        let raw = parse_dataset(&images_path, &labels_path, Some(2)).unwrap();
        assert_eq!(raw.labels, vec![1, 2]);
        assert_eq!(raw.images.nrows(), 2);

        fs::write(&labels_path, label_file(&[1, 2, 3])).unwrap();
        assert!(parse_dataset(&images_path, &labels_path, None).is_err());
    }
}
