//! Image loading utilities.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use ndarray::{Array3, Array4};

use crate::error::{Error, Result};
use crate::latent::{Latent, Mask};

use super::RGB_CHANNELS;

fn open(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an image from disk as a single-sample latent.
///
/// The image is:
/// 1. Loaded from the specified path
/// 2. Converted to RGB if necessary
/// 3. Normalized to [-1, 1] range
/// 4. Returned as NCHW tensor (1, 3, height, width)
///
/// # Errors
///
/// Returns an error if the image cannot be loaded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Latent> {
    let path = path.as_ref();
    let img = open(path)?;
    tracing::debug!(path = %path.display(), dims = ?img.dimensions(), "loaded image");
    Ok(Latent::new(image_to_tensor(&img)))
}

/// Load a grayscale mask from disk, normalized to [0, 1].
///
/// # Errors
///
/// Returns an error if the image cannot be loaded.
pub fn load_mask_image<P: AsRef<Path>>(path: P) -> Result<Mask> {
    let path = path.as_ref();
    let img = open(path)?;
    Ok(image_to_mask(&img))
}

/// Convert a `DynamicImage` to a normalized NCHW tensor.
fn image_to_tensor(img: &DynamicImage) -> Array4<f32> {
    let rgb = img.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);

    let mut tensor = Array4::<f32>::zeros((1, RGB_CHANNELS, height, width));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..RGB_CHANNELS {
            // Normalize from [0, 255] to [-1, 1]
            tensor[[0, c, y, x]] = (f32::from(pixel[c]) / 127.5) - 1.0;
        }
    }

    tensor
}

/// Convert a `DynamicImage` to a (1, height, width) mask in [0, 1].
fn image_to_mask(img: &DynamicImage) -> Mask {
    let luma = img.to_luma8();
    let (width, height) = (luma.width() as usize, luma.height() as usize);

    Array3::from_shape_fn((1, height, width), |(_, y, x)| {
        // Safe: x and y are bounded by the image dimensions, which are u32
        #[allow(clippy::cast_possible_truncation)]
        let value = luma.get_pixel(x as u32, y as u32)[0];
        f32::from(value) / 255.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape() {
        let img = DynamicImage::new_rgb8(100, 60);
        let tensor = image_to_tensor(&img);

        assert_eq!(tensor.shape(), &[1, 3, 60, 100]);
    }

    #[test]
    fn test_normalization_range() {
        let img = DynamicImage::new_rgb8(16, 16);
        let tensor = image_to_tensor(&img);

        let min = tensor.iter().copied().fold(f32::INFINITY, f32::min);
        let max = tensor.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        // Black image should be all -1.0
        assert!((min - (-1.0)).abs() < 0.01);
        assert!((max - (-1.0)).abs() < 0.01);
    }

    #[test]
    fn test_mask_range() {
        let mut gray = image::GrayImage::new(4, 2);
        gray.put_pixel(3, 1, image::Luma([255]));
        let mask = image_to_mask(&DynamicImage::ImageLuma8(gray));

        assert_eq!(mask.dim(), (1, 2, 4));
        assert!((mask[[0, 1, 3]] - 1.0).abs() < f32::EPSILON);
        assert!(mask[[0, 0, 0]].abs() < f32::EPSILON);
    }
}
