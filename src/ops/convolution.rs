//! Box blur and unsharp-mask sharpening with reflect padding.

use ndarray::{Array2, ArrayView2, ArrayViewMut2, Axis};

use crate::error::{Error, Result};
use crate::latent::{ChannelSelector, Latent};
use crate::sampling::reflect_index;

/// Kernel sizes must be odd so the window has a centre pixel.
fn check_kernel_size(kernel_size: usize) -> Result<()> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(Error::invalid(
            "kernel_size",
            format!("must be a positive odd number, got {kernel_size}"),
        ));
    }
    Ok(())
}

/// Mean over a `kernel_size × kernel_size` window, edges reflected.
///
/// Computed separably: a horizontal window sum, then a vertical one.
#[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
pub(crate) fn box_blur_plane(plane: ArrayView2<'_, f32>, kernel_size: usize) -> Array2<f32> {
    let (h, w) = plane.dim();
    let radius = (kernel_size / 2) as isize;

    let mut rows = Array2::<f32>::zeros((h, w));
    for ((y, x), out) in rows.indexed_iter_mut() {
        *out = (-radius..=radius)
            .map(|dx| plane[[y, reflect_index(x as isize + dx, w)]])
            .sum();
    }

    let area = (kernel_size * kernel_size) as f32;
    Array2::from_shape_fn((h, w), |(y, x)| {
        let sum: f32 = (-radius..=radius)
            .map(|dy| rows[[reflect_index(y as isize + dy, h), x]])
            .sum();
        sum / area
    })
}

/// Run `f` on each spatial plane of the selected channels.
fn for_selected_planes<F>(latent: &Latent, channel: ChannelSelector, mut f: F) -> Result<Latent>
where
    F: FnMut(ArrayViewMut2<'_, f32>),
{
    let range = channel.range(latent.channels())?;
    let mut samples = latent.samples.clone();
    for mut batch in samples.outer_iter_mut() {
        for c in range.clone() {
            f(batch.index_axis_mut(Axis(0), c));
        }
    }
    Ok(latent.with_samples(samples))
}

/// Box-blur the selected channels.
///
/// `kernel_size = 1` returns the input unchanged.
///
/// # Errors
///
/// Returns an error if `kernel_size` is even or zero, or the channel does not exist.
pub fn blur(latent: &Latent, channel: ChannelSelector, kernel_size: usize) -> Result<Latent> {
    check_kernel_size(kernel_size)?;
    tracing::debug!(%channel, kernel_size, shape = ?latent.dim(), "blur");

    for_selected_planes(latent, channel, |mut plane| {
        let blurred = box_blur_plane(plane.view(), kernel_size);
        plane.assign(&blurred);
    })
}

/// Unsharp-mask the selected channels: `x + strength × (x − blur(x))`.
///
/// Negative strengths blur instead.
///
/// # Errors
///
/// Returns an error if `kernel_size` is even or zero, or the channel does not exist.
pub fn sharpen(
    latent: &Latent,
    channel: ChannelSelector,
    strength: f32,
    kernel_size: usize,
) -> Result<Latent> {
    check_kernel_size(kernel_size)?;
    tracing::debug!(%channel, strength, kernel_size, shape = ?latent.dim(), "sharpen");

    for_selected_planes(latent, channel, |mut plane| {
        let blurred = box_blur_plane(plane.view(), kernel_size);
        plane.zip_mut_with(&blurred, |x, &b| *x += strength * (*x - b));
    })
}
