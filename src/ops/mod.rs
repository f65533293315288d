//! The transforms themselves. Every function here borrows its inputs and
//! returns a freshly allocated container.

mod blend;
mod channel;
mod convolution;
mod noise;
mod pointwise;
mod warp;

pub use blend::{blend, BlendMode};
pub use channel::{
    channel_add, channel_multiply, channel_transform, hue_rotation_matrix, hue_shift,
    ChannelMatrix, CHANNEL_PARAMS, IDENTITY,
};
pub use convolution::{blur, sharpen};
pub use noise::{gaussian_noise, MAX_SEED};
pub use pointwise::{
    add, brightness, clamp, contrast, exposure, gamma, invert, levels, multiply, RANGE_EPSILON,
};
pub use warp::{wave, Wave, WaveDirection};
