use image::{GrayImage, Luma};
use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use std::path::Path;

use crate::error::{Result, SoftmaxError};
use crate::parsing::{IMAGE_SIDE, NUM_FEATURES};

/// Lay out the weight column of every class (bias row excluded) as a 28x28 tile,
/// tiles side by side from class 0 on the left
pub fn weight_tiles(w: &ArrayView2<f64>) -> Result<Array2<f64>> {
    if w.nrows() < NUM_FEATURES {
        return Err(SoftmaxError::ShapeMismatch {
            context: "weight tiles",
            expected: (NUM_FEATURES, w.ncols()),
            found: w.dim(),
        });
    }

    let classes = w.ncols();
    let mut tiles = Array2::zeros((IMAGE_SIDE, IMAGE_SIDE * classes));
    for class in 0..classes {
        let column = w.slice(s![..NUM_FEATURES, class]);
        let tile = column
            .to_shape((IMAGE_SIDE, IMAGE_SIDE))
            .map_err(|_| SoftmaxError::ShapeMismatch {
                context: "weight tile",
                expected: (IMAGE_SIDE, IMAGE_SIDE),
                found: (column.len(), 1),
            })?;

        tiles
            .slice_mut(s![.., class * IMAGE_SIDE..(class + 1) * IMAGE_SIDE])
            .assign(&tile);
    }

    Ok(tiles)
}

/// Min-max rescale to [0, 1]. A constant image maps to all zeros
pub fn normalize(image: &ArrayView2<f64>) -> Array2<f64> {
    let min = image.fold(f64::INFINITY, |acc, &x| acc.min(x));
    let max = image.fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));
    let range = max - min;

    if !range.is_finite() || range == 0f64 {
        return Array2::zeros(image.dim());
    }

    image.mapv(|x| (x - min) / range)
}

/// Place `top` above `bottom`
pub fn stack_vertical(top: &ArrayView2<f64>, bottom: &ArrayView2<f64>) -> Result<Array2<f64>> {
    concatenate(Axis(0), &[top.view(), bottom.view()]).map_err(|_| SoftmaxError::ShapeMismatch {
        context: "stack images",
        expected: (bottom.nrows(), top.ncols()),
        found: bottom.dim(),
    })
}

/// Convert values in [0, 1] to an 8-bit grayscale image
pub fn to_gray_image(image: &ArrayView2<f64>) -> GrayImage {
    let (height, width) = image.dim();

    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let value = image[[y as usize, x as usize]].clamp(0f64, 1f64);
        Luma([(value * 255f64).round() as u8])
    })
}

pub fn save_gray(path: &Path, image: &ArrayView2<f64>) -> Result<()> {
    to_gray_image(image).save(path)?;
    Ok(())
}
