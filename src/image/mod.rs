//! Conversion between image files and sample tensors.
//!
//! Images map to `(1, 3, height, width)` tensors with values in [-1, 1];
//! grayscale masks map to `(1, height, width)` with values in [0, 1].

mod load;
mod save;

pub use load::{load_image, load_mask_image};
pub use save::save_image;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
