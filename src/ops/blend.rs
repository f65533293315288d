//! Two-input blending with an optional spatial mask.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array3, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::latent::{Latent, Mask};
use crate::sampling::{resize_bilinear, resize_mask};

/// How the second input is combined with the first before mixing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Take `b` as is.
    #[default]
    Normal,
    /// `a × b`.
    Multiply,
    /// `a + b`.
    Add,
    /// `a − b`.
    Subtract,
}

impl BlendMode {
    /// Option strings accepted by [`FromStr`].
    pub const OPTIONS: [&'static str; 4] = ["normal", "multiply", "add", "subtract"];

    #[inline]
    fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            Self::Normal => b,
            Self::Multiply => a * b,
            Self::Add => a + b,
            Self::Subtract => a - b,
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Normal => "normal",
            Self::Multiply => "multiply",
            Self::Add => "add",
            Self::Subtract => "subtract",
        };
        f.write_str(label)
    }
}

impl FromStr for BlendMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normal" => Ok(Self::Normal),
            "multiply" => Ok(Self::Multiply),
            "add" => Ok(Self::Add),
            "subtract" => Ok(Self::Subtract),
            other => Err(Error::invalid(
                "mode",
                format!("invalid blend mode {other:?}, expected one of {:?}", Self::OPTIONS),
            )),
        }
    }
}

/// Blend `b` into `a`.
///
/// 1. `b` must have `a`'s batch size and channel count; its spatial size is
///    bilinearly resampled to `a`'s when they differ.
/// 2. The per-pixel factor is `clamp(mask × strength, 0, 1)` with a mask
///    (resampled to `a`'s size, a batch of 1 is broadcast), else `strength`.
/// 3. `out = a × (1 − factor) + mode(a, b) × factor`
///
/// The output keeps `a`'s metadata.
///
/// # Errors
///
/// Returns an error if batch sizes, channel counts or the mask batch don't line up.
pub fn blend(
    a: &Latent,
    b: &Latent,
    mode: BlendMode,
    strength: f32,
    mask: Option<&Mask>,
) -> Result<Latent> {
    let (batch, channels, height, width) = a.dim();
    let (b_batch, b_channels, b_height, b_width) = b.dim();

    if (b_batch, b_channels) != (batch, channels) {
        return Err(Error::shape(
            format!("latent_b with batch {batch} and {channels} channels"),
            format!("batch {b_batch} and {b_channels} channels"),
        ));
    }
    tracing::debug!(
        %mode,
        strength,
        masked = mask.is_some(),
        shape = ?a.dim(),
        "blend"
    );

    let resized;
    let b_samples = if (b_height, b_width) == (height, width) {
        &b.samples
    } else {
        tracing::debug!(
            from = ?(b_height, b_width),
            to = ?(height, width),
            "resampling latent_b"
        );
        resized = resize_bilinear(&b.samples, height, width);
        &resized
    };

    let factor = blend_factor(mask, strength, batch, height, width)?;

    let mut samples = a.samples.clone();
    Zip::indexed(&mut samples)
        .and(b_samples)
        .for_each(|(n, _, y, x), out, &bv| {
            let f = factor[[n, y, x]];
            let av = *out;
            *out = av * (1.0 - f) + mode.combine(av, bv) * f;
        });

    Ok(a.with_samples(samples))
}

/// Per-pixel blend weights shaped (batch, height, width).
fn blend_factor(
    mask: Option<&Mask>,
    strength: f32,
    batch: usize,
    height: usize,
    width: usize,
) -> Result<Array3<f32>> {
    let Some(mask) = mask else {
        return Ok(Array3::from_elem((batch, height, width), strength));
    };

    let mask_batch = mask.len_of(Axis(0));
    if mask_batch != batch && mask_batch != 1 {
        return Err(Error::shape(
            format!("mask batch of 1 or {batch}"),
            format!("mask batch of {mask_batch}"),
        ));
    }

    let (_, mask_height, mask_width) = mask.dim();
    let resized;
    let mask = if (mask_height, mask_width) == (height, width) {
        mask
    } else {
        resized = resize_mask(mask, height, width);
        &resized
    };

    let view = mask.broadcast((batch, height, width)).ok_or_else(|| {
        Error::shape(
            format!("mask broadcastable to {:?}", (batch, height, width)),
            format!("{:?}", mask.dim()),
        )
    })?;
    Ok(view.mapv(|m| (m * strength).clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array4};

    const EPSILON: f32 = 1e-5;

    fn latent(seed: usize, dim: (usize, usize, usize, usize)) -> Latent {
        Latent::new(Array4::from_shape_fn(dim, |(b, c, y, x)| {
            #[allow(clippy::cast_precision_loss)]
            let v = (seed * 13 + b * 11 + c * 7 + y * 5 + x * 3) as f32;
            (v * 0.17).sin()
        }))
    }

    #[test]
    fn test_mode_parse() {
        for option in BlendMode::OPTIONS {
            assert_eq!(option.parse::<BlendMode>().unwrap().to_string(), option);
        }
        assert!(matches!(
            "screen".parse::<BlendMode>(),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_normal_with_self_is_identity() {
        let a = latent(1, (2, 4, 5, 6));
        let out = blend(&a, &a, BlendMode::Normal, 1.0, None).unwrap();
        assert_eq!(out.samples, a.samples);
    }

    #[test]
    fn test_zero_strength_is_identity() {
        let a = latent(1, (2, 4, 5, 6));
        let b = latent(2, (2, 4, 5, 6));
        let out = blend(&a, &b, BlendMode::Add, 0.0, None).unwrap();
        assert_eq!(out.samples, a.samples);
    }

    #[test]
    fn test_modes_at_full_strength() {
        let a = latent(1, (1, 4, 3, 3));
        let b = latent(2, (1, 4, 3, 3));
        let cases = [
            (BlendMode::Normal, b.samples.clone()),
            (BlendMode::Multiply, &a.samples * &b.samples),
            (BlendMode::Add, &a.samples + &b.samples),
            (BlendMode::Subtract, &a.samples - &b.samples),
        ];
        for (mode, expected) in cases {
            let out = blend(&a, &b, mode, 1.0, None).unwrap();
            for (got, want) in out.samples.iter().zip(expected.iter()) {
                assert!((got - want).abs() < EPSILON, "{mode}: {got} vs {want}");
            }
        }
    }

    #[test]
    fn test_resamples_second_input() {
        let a = latent(1, (1, 4, 8, 8));
        let b = Latent::new(Array4::from_elem((1, 4, 4, 4), 0.5));
        let out = blend(&a, &b, BlendMode::Normal, 1.0, None).unwrap();
        assert_eq!(out.dim(), a.dim());
        assert!(out.samples.iter().all(|v| (v - 0.5).abs() < EPSILON));
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let a = latent(1, (1, 4, 4, 4));
        let b = latent(2, (1, 3, 4, 4));
        assert!(matches!(
            blend(&a, &b, BlendMode::Add, 1.0, None),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_mask_selects_regions() {
        let a = Latent::new(Array4::zeros((2, 4, 2, 2)));
        let b = Latent::new(Array4::ones((2, 4, 2, 2)));
        let mut mask = Mask::zeros((1, 2, 2));
        mask[[0, 0, 1]] = 1.0;

        let out = blend(&a, &b, BlendMode::Normal, 1.0, Some(&mask)).unwrap();
        for n in 0..2 {
            for c in 0..4 {
                assert_eq!(out.samples[[n, c, 0, 1]], 1.0);
                assert_eq!(out.samples[[n, c, 0, 0]], 0.0);
                assert_eq!(out.samples[[n, c, 1, 1]], 0.0);
            }
        }
    }

    #[test]
    fn test_mask_factor_clamped() {
        let a = Latent::new(Array4::zeros((1, 1, 2, 2)));
        let b = Latent::new(Array4::ones((1, 1, 2, 2)));
        let mask = Mask::from_elem((1, 2, 2), 4.0);
        let out = blend(&a, &b, BlendMode::Normal, 0.5, Some(&mask)).unwrap();
        assert!(out.samples.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_mask_resized() {
        let a = Latent::new(Array4::zeros((1, 2, 6, 6)));
        let b = Latent::new(Array4::ones((1, 2, 6, 6)));
        let mask = Mask::from_elem((1, 3, 3), 0.25);
        let out = blend(&a, &b, BlendMode::Normal, 1.0, Some(&mask)).unwrap();
        assert!(out
            .samples
            .slice(s![0, .., .., ..])
            .iter()
            .all(|v| (v - 0.25).abs() < EPSILON));
    }

    #[test]
    fn test_mask_batch_mismatch_rejected() {
        let a = latent(1, (3, 4, 2, 2));
        let mask = Mask::ones((2, 2, 2));
        assert!(matches!(
            blend(&a, &a, BlendMode::Normal, 1.0, Some(&mask)),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
