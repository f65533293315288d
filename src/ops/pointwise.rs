//! Per-pixel scalar operations and tone adjustments.

use ndarray::{s, ArrayViewMut2};

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::latent::{ChannelSelector, Latent, SampleTensor};

/// Added to normalization denominators so constant ranges don't divide by zero.
pub const RANGE_EPSILON: f32 = 1e-8;

/// Apply `f` to every element of the selected channels of a copy of `latent`.
fn map_selected<F>(latent: &Latent, channel: ChannelSelector, f: F) -> Result<Latent>
where
    F: Fn(f32) -> f32,
{
    let range = channel.range(latent.channels())?;
    let mut samples = latent.samples.clone();
    samples.slice_mut(s![.., range, .., ..]).mapv_inplace(f);
    Ok(latent.with_samples(samples))
}

/// Run `f` on every (batch, channel) spatial plane.
fn for_each_plane<F>(samples: &mut SampleTensor, mut f: F)
where
    F: FnMut(ArrayViewMut2<'_, f32>),
{
    for mut batch in samples.outer_iter_mut() {
        for plane in batch.outer_iter_mut() {
            f(plane);
        }
    }
}

/// Multiply the selected channels by `factor`.
///
/// # Errors
///
/// Returns an error if the selected channel does not exist.
pub fn multiply(latent: &Latent, channel: ChannelSelector, factor: f32) -> Result<Latent> {
    tracing::debug!(%channel, factor, shape = ?latent.dim(), "multiply");
    map_selected(latent, channel, |v| v * factor)
}

/// Add `amount` to the selected channels.
///
/// # Errors
///
/// Returns an error if the selected channel does not exist.
pub fn add(latent: &Latent, channel: ChannelSelector, amount: f32) -> Result<Latent> {
    tracing::debug!(%channel, amount, shape = ?latent.dim(), "add");
    map_selected(latent, channel, |v| v + amount)
}

/// Shift every value by `amount`.
///
/// # Errors
///
/// Returns an error if the configured safety clamp has invalid bounds.
pub fn brightness(latent: &Latent, amount: f32, config: &FilterConfig) -> Result<Latent> {
    tracing::debug!(amount, shape = ?latent.dim(), "brightness");
    let mut samples = latent.samples.mapv(|v| v + amount);
    config.clamp(&mut samples)?;
    Ok(latent.with_samples(samples))
}

/// Scale each plane's distance from its spatial mean by `1 + amount`.
///
/// # Errors
///
/// Returns an error if the configured safety clamp has invalid bounds.
pub fn contrast(latent: &Latent, amount: f32, config: &FilterConfig) -> Result<Latent> {
    tracing::debug!(amount, shape = ?latent.dim(), "contrast");
    let gain = 1.0 + amount;
    let mut samples = latent.samples.clone();
    for_each_plane(&mut samples, |mut plane| {
        let mean = plane.mean().unwrap_or(0.0);
        plane.mapv_inplace(|v| (v - mean) * gain + mean);
    });
    config.clamp(&mut samples)?;
    Ok(latent.with_samples(samples))
}

/// Multiply every value by `factor`.
///
/// # Errors
///
/// Returns an error if the configured safety clamp has invalid bounds.
pub fn exposure(latent: &Latent, factor: f32, config: &FilterConfig) -> Result<Latent> {
    tracing::debug!(factor, shape = ?latent.dim(), "exposure");
    let mut samples = latent.samples.mapv(|v| v * factor);
    config.clamp(&mut samples)?;
    Ok(latent.with_samples(samples))
}

/// Gamma-correct each plane within its own min/max range.
///
/// ```text
/// n   = (x − min) / (max − min + ε)
/// out = n^(1/gamma) × (max − min) + min
/// ```
///
/// A constant plane normalizes to zero and maps back onto itself.
///
/// # Errors
///
/// Returns an error if `gamma` is not a positive finite number or the
/// configured safety clamp has invalid bounds.
pub fn gamma(latent: &Latent, gamma: f32, config: &FilterConfig) -> Result<Latent> {
    if !(gamma.is_finite() && gamma > 0.0) {
        return Err(Error::invalid(
            "gamma",
            format!("must be a positive number, got {gamma}"),
        ));
    }
    tracing::debug!(gamma, shape = ?latent.dim(), "gamma");

    let exponent = 1.0 / gamma;
    let mut samples = latent.samples.clone();
    for_each_plane(&mut samples, |mut plane| {
        let (min, max) = plane
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min > max {
            return;
        }
        let span = max - min;
        plane.mapv_inplace(|v| {
            let normalized = (v - min) / (span + RANGE_EPSILON);
            normalized.powf(exponent) * span + min
        });
    });
    config.clamp(&mut samples)?;
    Ok(latent.with_samples(samples))
}

/// Negate every value.
///
/// # Errors
///
/// Returns an error if the configured safety clamp has invalid bounds.
pub fn invert(latent: &Latent, config: &FilterConfig) -> Result<Latent> {
    tracing::debug!(shape = ?latent.dim(), "invert");
    let mut samples = latent.samples.mapv(|v| -v);
    config.clamp(&mut samples)?;
    Ok(latent.with_samples(samples))
}

/// Clamp every value into `[min_val, max_val]`.
///
/// # Errors
///
/// Returns an error if `min_val > max_val` or either bound is NaN.
pub fn clamp(latent: &Latent, min_val: f32, max_val: f32) -> Result<Latent> {
    check_bounds("min_val", min_val, max_val)?;
    tracing::debug!(min_val, max_val, shape = ?latent.dim(), "clamp");
    Ok(latent.with_samples(latent.samples.mapv(|v| v.clamp(min_val, max_val))))
}

/// Remap `[in_black, in_white]` onto `[out_black, out_white]`.
///
/// Values outside the input range are clipped first.
///
/// # Errors
///
/// Returns an error if `in_black > in_white`, either bound is NaN, or the
/// configured safety clamp has invalid bounds.
pub fn levels(
    latent: &Latent,
    in_black: f32,
    in_white: f32,
    out_black: f32,
    out_white: f32,
    config: &FilterConfig,
) -> Result<Latent> {
    check_bounds("in_black", in_black, in_white)?;
    tracing::debug!(
        in_black,
        in_white,
        out_black,
        out_white,
        shape = ?latent.dim(),
        "levels"
    );

    let in_span = in_white - in_black + RANGE_EPSILON;
    let out_span = out_white - out_black;
    let mut samples = latent.samples.mapv(|v| {
        let normalized = (v.clamp(in_black, in_white) - in_black) / in_span;
        normalized * out_span + out_black
    });
    config.clamp(&mut samples)?;
    Ok(latent.with_samples(samples))
}

/// `f32::clamp` panics on inverted or NaN bounds; reject those up front.
fn check_bounds(name: &str, lo: f32, hi: f32) -> Result<()> {
    if lo.is_nan() || hi.is_nan() {
        return Err(Error::invalid(name, "bounds must not be NaN"));
    }
    if lo > hi {
        return Err(Error::invalid(
            name,
            format!("lower bound {lo} is greater than upper bound {hi}"),
        ));
    }
    Ok(())
}
