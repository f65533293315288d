//! Seeded additive Gaussian noise.

use ndarray::{s, Array4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{Error, Result};
use crate::latent::{ChannelSelector, Latent};

/// Largest accepted seed.
pub const MAX_SEED: u64 = 0xFFFF_FFFF;

/// Add `strength`-scaled standard-normal noise to the selected channels.
///
/// The generator is created from `seed` for this call only. Noise is drawn
/// for the whole tensor in row-major order, so the values a channel receives
/// do not depend on which channel was selected.
///
/// # Errors
///
/// Returns an error if the seed is out of range or the channel does not exist.
pub fn gaussian_noise(
    latent: &Latent,
    channel: ChannelSelector,
    strength: f32,
    seed: u64,
) -> Result<Latent> {
    if seed > MAX_SEED {
        return Err(Error::invalid(
            "seed",
            format!("must be at most {MAX_SEED:#x}, got {seed}"),
        ));
    }
    let range = channel.range(latent.channels())?;
    tracing::debug!(%channel, strength, seed, shape = ?latent.dim(), "gaussian noise");

    let mut rng = StdRng::seed_from_u64(seed);
    let noise: Array4<f32> = Array4::from_shape_fn(latent.dim(), |_| {
        let sample: f32 = rng.sample(StandardNormal);
        sample * strength
    });

    let mut samples = latent.samples.clone();
    samples
        .slice_mut(s![.., range.clone(), .., ..])
        .zip_mut_with(&noise.slice(s![.., range, .., ..]), |x, &n| *x += n);
    Ok(latent.with_samples(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Latent {
        Latent::new(Array4::from_shape_fn((2, 4, 8, 8), |(b, c, y, x)| {
            #[allow(clippy::cast_precision_loss)]
            let v = (b + c + y + x) as f32;
            v * 0.1
        }))
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let latent = sample();
        let a = gaussian_noise(&latent, ChannelSelector::All, 0.5, 42).unwrap();
        let b = gaussian_noise(&latent, ChannelSelector::All, 0.5, 42).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.samples, latent.samples);
    }

    #[test]
    fn test_different_seed_differs() {
        let latent = sample();
        let a = gaussian_noise(&latent, ChannelSelector::All, 0.5, 1).unwrap();
        let b = gaussian_noise(&latent, ChannelSelector::All, 0.5, 2).unwrap();
        assert_ne!(a.samples, b.samples);
    }

    #[test]
    fn test_unselected_channels_untouched() {
        let latent = sample();
        let out = gaussian_noise(&latent, ChannelSelector::C1, 1.0, 7).unwrap();
        for c in [0, 2, 3] {
            assert_eq!(
                out.samples.slice(s![.., c, .., ..]),
                latent.samples.slice(s![.., c, .., ..])
            );
        }
        assert_ne!(
            out.samples.slice(s![.., 1, .., ..]),
            latent.samples.slice(s![.., 1, .., ..])
        );
    }

    #[test]
    fn test_selected_channel_matches_full_draw() {
        let latent = sample();
        let all = gaussian_noise(&latent, ChannelSelector::All, 1.0, 9).unwrap();
        let one = gaussian_noise(&latent, ChannelSelector::C2, 1.0, 9).unwrap();
        assert_eq!(
            all.samples.slice(s![.., 2, .., ..]),
            one.samples.slice(s![.., 2, .., ..])
        );
    }

    #[test]
    fn test_zero_strength_is_identity() {
        let latent = sample();
        let out = gaussian_noise(&latent, ChannelSelector::All, 0.0, 3).unwrap();
        assert_eq!(out.samples, latent.samples);
    }

    #[test]
    fn test_seed_out_of_range() {
        let latent = sample();
        assert!(gaussian_noise(&latent, ChannelSelector::All, 1.0, MAX_SEED + 1).is_err());
    }
}
