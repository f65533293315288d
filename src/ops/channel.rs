//! Channel-indexed operations: per-channel gain/bias and 3x3 channel mixing.

use ndarray::{s, Axis};

use crate::latent::Latent;

/// Number of per-channel parameters the gain/bias operations take.
pub const CHANNEL_PARAMS: usize = 4;

/// Row-major 3x3 mixing matrix; `out[i] = Σ m[i][j] × in[j]`.
pub type ChannelMatrix = [[f32; 3]; 3];

/// The identity mixing matrix.
pub const IDENTITY: ChannelMatrix = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Apply `f(value, param)` to channel `i` for every `i < min(channels, 4)`.
fn per_channel<F>(latent: &Latent, params: [f32; CHANNEL_PARAMS], f: F) -> Latent
where
    F: Fn(f32, f32) -> f32,
{
    let mut samples = latent.samples.clone();
    let count = latent.channels().min(CHANNEL_PARAMS);
    for (c, &param) in params.iter().enumerate().take(count) {
        samples
            .index_axis_mut(Axis(1), c)
            .mapv_inplace(|v| f(v, param));
    }
    latent.with_samples(samples)
}

/// Scale channel `i` by `factors[i]`.
///
/// Channels past the fourth are left alone; factors for channels the tensor
/// doesn't have are ignored.
#[must_use]
pub fn channel_multiply(latent: &Latent, factors: [f32; CHANNEL_PARAMS]) -> Latent {
    tracing::debug!(?factors, shape = ?latent.dim(), "channel multiply");
    per_channel(latent, factors, |v, factor| v * factor)
}

/// Offset channel `i` by `biases[i]`.
///
/// Same channel-count rules as [`channel_multiply`].
#[must_use]
pub fn channel_add(latent: &Latent, biases: [f32; CHANNEL_PARAMS]) -> Latent {
    tracing::debug!(?biases, shape = ?latent.dim(), "channel add");
    per_channel(latent, biases, |v, bias| v + bias)
}

/// Mix the first three channels through `matrix` at every pixel.
///
/// Channels from index 3 on are untouched. Tensors with fewer than three
/// channels come back unchanged.
#[must_use]
pub fn channel_transform(latent: &Latent, matrix: &ChannelMatrix) -> Latent {
    let mut samples = latent.samples.clone();
    if latent.channels() < 3 {
        tracing::debug!(channels = latent.channels(), "channel transform skipped");
        return latent.with_samples(samples);
    }
    tracing::debug!(?matrix, shape = ?latent.dim(), "channel transform");

    for mut lane in samples.slice_mut(s![.., ..3, .., ..]).lanes_mut(Axis(1)) {
        let v = [lane[0], lane[1], lane[2]];
        for (out, row) in lane.iter_mut().zip(matrix) {
            *out = row[0] * v[0] + row[1] * v[1] + row[2] * v[2];
        }
    }
    latent.with_samples(samples)
}

/// Rotation by `angle_deg` about the gray axis `(1, 1, 1)` of channel space.
///
/// ```text
/// u = cos θ, w = sin θ, a = (1 − u) / 3, k = w / √3
///
/// | u+a  a−k  a+k |
/// | a+k  u+a  a−k |
/// | a−k  a+k  u+a |
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn hue_rotation_matrix(angle_deg: f32) -> ChannelMatrix {
    let theta = f64::from(angle_deg).to_radians();
    let u = theta.cos();
    let w = theta.sin();
    let a = (1.0 - u) / 3.0;
    let k = w / 3.0_f64.sqrt();

    let diag = (u + a) as f32;
    let minus = (a - k) as f32;
    let plus = (a + k) as f32;

    [[diag, minus, plus], [plus, diag, minus], [minus, plus, diag]]
}

/// Rotate the first three channels about the gray axis by `angle_deg`.
#[must_use]
pub fn hue_shift(latent: &Latent, angle_deg: f32) -> Latent {
    tracing::debug!(angle_deg, "hue shift");
    channel_transform(latent, &hue_rotation_matrix(angle_deg))
}
