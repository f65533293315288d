//! # latent-transforms
//!
//! Stateless filters over batches of latent samples: tone adjustments,
//! per-channel gain and bias, channel mixing and hue rotation, box blur and
//! sharpening, seeded Gaussian noise, masked blending and a sinusoidal warp.
//!
//! Each filter borrows a [`Latent`] and returns a new one. Hosts that work in
//! terms of named nodes can go through the [`NodeRegistry`] instead.
//!
//! ## Example
//!
//! ```
//! use latent_transforms::latent::{ChannelSelector, Latent};
//! use latent_transforms::ops;
//! use ndarray::Array4;
//!
//! # fn main() -> latent_transforms::Result<()> {
//! let latent = Latent::new(Array4::from_elem((1, 4, 8, 8), 0.5));
//! let blurred = ops::blur(&latent, ChannelSelector::All, 3)?;
//! let brighter = ops::add(&blurred, ChannelSelector::C0, 0.25)?;
//! assert_eq!(brighter.dim(), (1, 4, 8, 8));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod image;
pub mod latent;
pub mod nodes;
pub mod ops;
pub mod sampling;

pub use config::{FilterConfig, SafetyClamp};
pub use error::{Error, Result};
pub use latent::{ChannelSelector, Latent};
pub use nodes::{Node, NodeInputs, NodeRegistry, Params};
