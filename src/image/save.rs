//! Image saving utilities.

use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::{ArrayView3, Axis};

use crate::error::{Error, Result};
use crate::latent::Latent;

use super::RGB_CHANNELS;

/// Save the first sample of a latent as an image file.
///
/// The tensor is:
/// 1. Denormalized from [-1, 1] to [0, 255]
/// 2. Written as grayscale for one channel, or RGB from the first three channels
/// 3. Saved to the specified path (format inferred from extension)
///
/// # Arguments
///
/// * `latent` - NCHW samples with values in [-1, 1]
/// * `path` - Output file path
/// * `quality` - JPEG quality (1-100), ignored for other formats
///
/// # Errors
///
/// Returns an error if the tensor has two channels or no samples, or the image cannot be saved.
pub fn save_image<P: AsRef<Path>>(latent: &Latent, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();
    let (batch, channels, _, _) = latent.dim();

    if batch == 0 {
        return Err(Error::shape("at least one sample", "an empty batch"));
    }
    if batch > 1 {
        tracing::warn!("Saving only the first of {batch} samples to {}", path.display());
    }

    let sample = latent.samples.index_axis(Axis(0), 0);
    let img = match channels {
        1 => DynamicImage::ImageLuma8(tensor_to_gray(sample)),
        c if c >= RGB_CHANNELS => DynamicImage::ImageRgb8(tensor_to_rgb(sample)),
        c => {
            return Err(Error::shape(
                "1 channel or at least 3 channels",
                format!("{c} channels"),
            ));
        }
    };

    // Determine format and save
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => {
            let mut output = std::fs::File::create(path)?;
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            img.write_with_encoder(encoder)
                .map_err(|source| Error::ImageSave {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        _ => {
            img.save(path).map_err(|source| Error::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}

/// Convert the first three channels of a CHW tensor to an RGB image.
#[allow(clippy::cast_possible_truncation)]
fn tensor_to_rgb(sample: ArrayView3<'_, f32>) -> RgbImage {
    let (_, height, width) = sample.dim();
    // Safe: dimensions came from u32 image sizes or are checked by the encoder
    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        image::Rgb([
            denormalize(sample[[0, y, x]]),
            denormalize(sample[[1, y, x]]),
            denormalize(sample[[2, y, x]]),
        ])
    })
}

/// Convert a single-channel CHW tensor to a grayscale image.
#[allow(clippy::cast_possible_truncation)]
fn tensor_to_gray(sample: ArrayView3<'_, f32>) -> GrayImage {
    let (_, height, width) = sample.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        image::Luma([denormalize(sample[[0, y as usize, x as usize]])])
    })
}

/// Denormalize a value from [-1, 1] to [0, 255] with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32) -> u8 {
    // Safe: clamped to [0, 255] range before casting
    let scaled = (value + 1.0) * 127.5;
    scaled.clamp(0.0, 255.0) as u8
}
