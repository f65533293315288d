//! Index reflection and bilinear resampling helpers.
//!
//! Resizing uses half-pixel centres without corner alignment; grid sampling
//! reads normalized `[-1, 1]` coordinates and clamps them to the border.

use ndarray::{Array2, Array3, Array4, ArrayView2, Axis};

/// Mirror an out-of-range index back into `0..len` without repeating the edge sample.
///
/// `-1` maps to `1` and `len` maps to `len - 2`. Indices further out keep
/// bouncing between the edges. A length-1 axis always maps to `0`.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn reflect_index(index: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = index.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}

/// Source position and blend weight along one axis.
#[derive(Debug, Clone, Copy)]
struct Tap {
    lo: usize,
    hi: usize,
    weight_hi: f32,
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn resize_taps(in_len: usize, out_len: usize) -> Vec<Tap> {
    let scale = in_len as f32 / out_len as f32;
    (0..out_len)
        .map(|dst| {
            let src = scale.mul_add(dst as f32 + 0.5, -0.5).max(0.0);
            let lo = (src as usize).min(in_len - 1);
            let hi = if lo + 1 < in_len { lo + 1 } else { lo };
            Tap {
                lo,
                hi,
                weight_hi: src - lo as f32,
            }
        })
        .collect()
}

/// Bilinearly resize one plane to `(out_h, out_w)`.
#[must_use]
pub fn resize_plane(src: ArrayView2<'_, f32>, out_h: usize, out_w: usize) -> Array2<f32> {
    let (in_h, in_w) = src.dim();
    if (in_h, in_w) == (out_h, out_w) {
        return src.to_owned();
    }
    if in_h == 0 || in_w == 0 {
        return Array2::zeros((out_h, out_w));
    }

    let rows = resize_taps(in_h, out_h);
    let cols = resize_taps(in_w, out_w);

    Array2::from_shape_fn((out_h, out_w), |(y, x)| {
        let ty = rows[y];
        let tx = cols[x];
        let top = src[[ty.lo, tx.lo]] * (1.0 - tx.weight_hi) + src[[ty.lo, tx.hi]] * tx.weight_hi;
        let bottom =
            src[[ty.hi, tx.lo]] * (1.0 - tx.weight_hi) + src[[ty.hi, tx.hi]] * tx.weight_hi;
        top * (1.0 - ty.weight_hi) + bottom * ty.weight_hi
    })
}

/// Bilinearly resize the spatial dims of an NCHW tensor.
#[must_use]
pub fn resize_bilinear(src: &Array4<f32>, out_h: usize, out_w: usize) -> Array4<f32> {
    let (b, c, _, _) = src.dim();
    let mut out = Array4::zeros((b, c, out_h, out_w));
    for (mut out_batch, src_batch) in out.outer_iter_mut().zip(src.outer_iter()) {
        for (mut dst, plane) in out_batch.outer_iter_mut().zip(src_batch.outer_iter()) {
            dst.assign(&resize_plane(plane, out_h, out_w));
        }
    }
    out
}

/// Bilinearly resize the spatial dims of a (batch, height, width) mask.
#[must_use]
pub fn resize_mask(mask: &Array3<f32>, out_h: usize, out_w: usize) -> Array3<f32> {
    let mut out = Array3::zeros((mask.len_of(Axis(0)), out_h, out_w));
    for (mut dst, plane) in out.outer_iter_mut().zip(mask.outer_iter()) {
        dst.assign(&resize_plane(plane, out_h, out_w));
    }
    out
}

/// Map a normalized coordinate onto a pixel position, clamped to the border.
#[allow(clippy::cast_precision_loss)]
fn unnormalize_border(coord: f32, len: usize) -> f32 {
    let size = len as f32;
    (((coord + 1.0) * size - 1.0) / 2.0).clamp(0.0, size - 1.0)
}

/// Sample `plane` at normalized coordinates `(gx, gy)` with bilinear
/// interpolation and border padding.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn sample_border(plane: ArrayView2<'_, f32>, gx: f32, gy: f32) -> f32 {
    let (h, w) = plane.dim();
    let x = unnormalize_border(gx, w);
    let y = unnormalize_border(gy, h);

    // Safe: x and y were clamped to [0, len - 1]
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let wx = x - x0 as f32;
    let wy = y - y0 as f32;

    let top = plane[[y0, x0]] * (1.0 - wx) + plane[[y0, x1]] * wx;
    let bottom = plane[[y1, x0]] * (1.0 - wx) + plane[[y1, x1]] * wx;
    top * (1.0 - wy) + bottom * wy
}
