//! Sinusoidal spatial warp.

use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::latent::{ChannelSelector, Latent};
use crate::sampling::sample_border;

/// Which axis the wave runs along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveDirection {
    /// Rows shift up and down as a function of horizontal position.
    #[default]
    Horizontal,
    /// Columns shift left and right as a function of vertical position.
    Vertical,
}

impl WaveDirection {
    /// Option strings accepted by [`FromStr`].
    pub const OPTIONS: [&'static str; 2] = ["horizontal", "vertical"];
}

impl fmt::Display for WaveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        })
    }
}

impl FromStr for WaveDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "horizontal" => Ok(Self::Horizontal),
            "vertical" => Ok(Self::Vertical),
            other => Err(Error::invalid(
                "direction",
                format!("{other:?} is not one of {:?}", Self::OPTIONS),
            )),
        }
    }
}

/// Shape of the wave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    /// Displacement in normalized units (the image spans 2.0).
    pub amplitude: f32,
    /// Cycles per normalized unit.
    pub frequency: f32,
    /// Phase offset in radians.
    pub phase: f32,
    /// Axis along which the wave runs.
    pub direction: WaveDirection,
}

/// `n` evenly spaced points from -1 to 1 inclusive; a single point sits at -1.
#[allow(clippy::cast_precision_loss)]
fn linspace_unit(n: usize) -> Array1<f32> {
    if n <= 1 {
        return Array1::from_elem(n, -1.0);
    }
    let step = 2.0 / (n - 1) as f32;
    Array1::from_shape_fn(n, |i| (i as f32).mul_add(step, -1.0))
}

/// Normalized sampling coordinates (x, y) for every output pixel.
fn displaced_grid(wave: &Wave, height: usize, width: usize) -> (Array2<f32>, Array2<f32>) {
    let xs = linspace_unit(width);
    let ys = linspace_unit(height);
    let shift = |coord: f32| wave.amplitude * (TAU * wave.frequency * coord + wave.phase).sin();

    let grid_x = Array2::from_shape_fn((height, width), |(y, x)| match wave.direction {
        WaveDirection::Horizontal => xs[x],
        WaveDirection::Vertical => xs[x] + shift(ys[y]),
    });
    let grid_y = Array2::from_shape_fn((height, width), |(y, x)| match wave.direction {
        WaveDirection::Horizontal => ys[y] + shift(xs[x]),
        WaveDirection::Vertical => ys[y],
    });

    (
        grid_x.mapv_into(|v| v.clamp(-1.0, 1.0)),
        grid_y.mapv_into(|v| v.clamp(-1.0, 1.0)),
    )
}

/// Resample the selected channels through a sinusoidally displaced grid.
///
/// The grid spans `[-1, 1]` on both axes. A horizontal wave moves the
/// vertical sampling coordinate by `amplitude × sin(2π × frequency × x + phase)`,
/// a vertical one moves the horizontal coordinate as a function of `y`.
/// Displaced coordinates are clamped to the image, and sampling is bilinear
/// with border padding.
///
/// # Errors
///
/// Returns an error if the selected channel does not exist.
pub fn wave(latent: &Latent, channel: ChannelSelector, wave: &Wave) -> Result<Latent> {
    let range = channel.range(latent.channels())?;
    let (_, _, height, width) = latent.dim();
    tracing::debug!(%channel, ?wave, shape = ?latent.dim(), "wave");

    let mut samples = latent.samples.clone();
    if height == 0 || width == 0 {
        return Ok(latent.with_samples(samples));
    }

    let (grid_x, grid_y) = displaced_grid(wave, height, width);
    for (mut out_batch, src_batch) in samples.outer_iter_mut().zip(latent.samples.outer_iter()) {
        for c in range.clone() {
            let src = src_batch.index_axis(Axis(0), c);
            let mut dst = out_batch.index_axis_mut(Axis(0), c);
            for ((pos, out), &gx) in dst.indexed_iter_mut().zip(grid_x.iter()) {
                *out = sample_border(src, gx, grid_y[pos]);
            }
        }
    }
    Ok(latent.with_samples(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array4};

    const EPSILON: f32 = 1e-5;

    fn sample() -> Latent {
        Latent::new(Array4::from_shape_fn((1, 4, 6, 8), |(_, c, y, x)| {
            #[allow(clippy::cast_precision_loss)]
            let v = (c * 48 + y * 8 + x) as f32;
            v * 0.01
        }))
    }

    fn flat(direction: WaveDirection) -> Wave {
        Wave {
            amplitude: 0.0,
            frequency: 5.0,
            phase: 0.0,
            direction,
        }
    }

    #[test]
    fn test_linspace_unit() {
        let xs = linspace_unit(5);
        let expected = [-1.0, -0.5, 0.0, 0.5, 1.0];
        for (got, want) in xs.iter().zip(expected) {
            assert!((got - want).abs() < EPSILON);
        }
        assert_eq!(linspace_unit(1).to_vec(), vec![-1.0]);
    }

    #[test]
    fn test_zero_amplitude_stays_close_to_input() {
        // linspace spans the outer pixel edges while pixel centres sit half a
        // pixel inside, so the flat grid resamples slightly but keeps corners.
        let latent = sample();
        let out = wave(&latent, ChannelSelector::All, &flat(WaveDirection::Horizontal)).unwrap();
        assert_eq!(out.dim(), latent.dim());
        for c in 0..4 {
            assert!((out.samples[[0, c, 0, 0]] - latent.samples[[0, c, 0, 0]]).abs() < EPSILON);
            assert!((out.samples[[0, c, 5, 7]] - latent.samples[[0, c, 5, 7]]).abs() < EPSILON);
        }
    }

    #[test]
    fn test_constant_input_unchanged() {
        let latent = Latent::new(Array4::from_elem((2, 4, 5, 5), 1.25));
        let params = Wave {
            amplitude: 0.3,
            frequency: 2.0,
            phase: 1.0,
            direction: WaveDirection::Vertical,
        };
        let out = wave(&latent, ChannelSelector::All, &params).unwrap();
        assert!(out.samples.iter().all(|v| (v - 1.25).abs() < EPSILON));
    }

    #[test]
    fn test_unselected_channels_untouched() {
        let latent = sample();
        let params = Wave {
            amplitude: 0.5,
            frequency: 1.0,
            phase: 0.3,
            direction: WaveDirection::Horizontal,
        };
        let out = wave(&latent, ChannelSelector::C3, &params).unwrap();
        assert_eq!(
            out.samples.slice(s![.., ..3, .., ..]),
            latent.samples.slice(s![.., ..3, .., ..])
        );
        assert_ne!(
            out.samples.slice(s![.., 3, .., ..]),
            latent.samples.slice(s![.., 3, .., ..])
        );
    }

    #[test]
    fn test_horizontal_wave_keeps_columns() {
        // Only the vertical coordinate moves, so a tensor that is constant
        // down each column is unaffected.
        let latent = Latent::new(Array4::from_shape_fn((1, 1, 4, 4), |(_, _, _, x)| {
            #[allow(clippy::cast_precision_loss)]
            let v = x as f32;
            v
        }));
        let params = Wave {
            amplitude: 0.4,
            frequency: 3.0,
            phase: 0.0,
            direction: WaveDirection::Horizontal,
        };
        let out = wave(&latent, ChannelSelector::All, &params).unwrap();
        let baseline =
            wave(&latent, ChannelSelector::All, &flat(WaveDirection::Horizontal)).unwrap();
        for (got, want) in out.samples.iter().zip(baseline.samples.iter()) {
            assert!((got - want).abs() < EPSILON);
        }
    }

    #[test]
    fn test_horizontal_wave_displaced_samples() {
        // v = 4y + x, so bilinear sampling reads back 4 * py + px exactly
        let latent = Latent::new(Array4::from_shape_fn((1, 1, 4, 4), |(_, _, y, x)| {
            #[allow(clippy::cast_precision_loss)]
            let v = (4 * y + x) as f32;
            v
        }));
        let params = Wave {
            amplitude: 0.5,
            frequency: 0.25,
            phase: 0.0,
            direction: WaveDirection::Horizontal,
        };
        let out = wave(&latent, ChannelSelector::All, &params).unwrap();

        // x = 3: gx = 1, gy = -1 + 0.5 * sin(pi / 2) = -0.5, pixel (3, 0.5)
        assert!((out.samples[[0, 0, 0, 3]] - 5.0).abs() < 1e-4);
        // x = 1: gx = -1/3, gy = -1/3 + 0.5 * sin(-pi / 6) = -7/12, pixel (5/6, 1/3)
        assert!((out.samples[[0, 0, 1, 1]] - 13.0 / 6.0).abs() < 1e-4);

        // Half a turn of phase flips the shift, pushing the top-right sample into the border
        let shifted = wave(
            &latent,
            ChannelSelector::All,
            &Wave {
                phase: std::f32::consts::PI,
                ..params
            },
        )
        .unwrap();
        assert!((shifted.samples[[0, 0, 0, 3]] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(
            "vertical".parse::<WaveDirection>().unwrap(),
            WaveDirection::Vertical
        );
        assert!("diagonal".parse::<WaveDirection>().is_err());
    }
}
