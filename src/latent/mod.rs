//! Sample containers, channel selection and mask types.

mod file;

pub use file::{load_latent, load_mask, save_latent};

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Sample tensor in NCHW format (batch, channels, height, width).
pub type SampleTensor = Array4<f32>;

/// Spatial blend mask (batch or 1, height, width) with values in [0, 1].
pub type Mask = Array3<f32>;

/// Metadata key some hosts use to record the latent-to-pixel scale.
pub const DOWNSCALE_RATIO_KEY: &str = "downscale_ratio_spacial";

/// Latent-to-pixel scale recorded under [`DOWNSCALE_RATIO_KEY`].
pub const DOWNSCALE_RATIO: u32 = 8;

/// A batch of samples plus whatever metadata the host attached to it.
///
/// Filters never mutate a container in place. They build a new one with
/// [`Latent::with_samples`], which carries the metadata over unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Latent {
    /// The sample tensor.
    pub samples: SampleTensor,
    /// Every other key of the host's container.
    pub metadata: BTreeMap<String, Value>,
}

impl Latent {
    /// Wrap a tensor in a container with no metadata.
    #[must_use]
    pub fn new(samples: SampleTensor) -> Self {
        Self {
            samples,
            metadata: BTreeMap::new(),
        }
    }

    /// Build a new container holding `samples` and a copy of this container's metadata.
    #[must_use]
    pub fn with_samples(&self, samples: SampleTensor) -> Self {
        Self {
            samples,
            metadata: self.metadata.clone(),
        }
    }

    /// `(batch, channels, height, width)`.
    #[must_use]
    pub fn dim(&self) -> (usize, usize, usize, usize) {
        self.samples.dim()
    }

    /// Number of channels.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.samples.dim().1
    }
}

impl From<SampleTensor> for Latent {
    fn from(samples: SampleTensor) -> Self {
        Self::new(samples)
    }
}

/// Which channels an operation touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelSelector {
    /// Every channel.
    #[default]
    All,
    /// Channel 0 only.
    C0,
    /// Channel 1 only.
    C1,
    /// Channel 2 only.
    C2,
    /// Channel 3 only.
    C3,
}

impl ChannelSelector {
    /// Option strings accepted by [`FromStr`], in declaration order.
    pub const OPTIONS: [&'static str; 5] = ["all", "c0", "c1", "c2", "c3"];

    /// The single channel index, or `None` for [`ChannelSelector::All`].
    #[must_use]
    pub const fn index(self) -> Option<usize> {
        match self {
            Self::All => None,
            Self::C0 => Some(0),
            Self::C1 => Some(1),
            Self::C2 => Some(2),
            Self::C3 => Some(3),
        }
    }

    /// Resolve to a channel range for a tensor with `channels` channels.
    ///
    /// # Errors
    ///
    /// Returns an error if a single channel is selected that the tensor does not have.
    pub fn range(self, channels: usize) -> Result<Range<usize>> {
        match self.index() {
            None => Ok(0..channels),
            Some(idx) if idx < channels => Ok(idx..idx + 1),
            Some(idx) => Err(Error::invalid(
                "channel",
                format!("channel {idx} selected but the tensor has {channels} channels"),
            )),
        }
    }
}

impl fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::All => "all",
            Self::C0 => "c0",
            Self::C1 => "c1",
            Self::C2 => "c2",
            Self::C3 => "c3",
        };
        f.write_str(label)
    }
}

impl FromStr for ChannelSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "c0" => Ok(Self::C0),
            "c1" => Ok(Self::C1),
            "c2" => Ok(Self::C2),
            "c3" => Ok(Self::C3),
            other => Err(Error::invalid(
                "channel",
                format!("{other:?} is not one of {:?}", Self::OPTIONS),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parse_roundtrip() {
        for option in ChannelSelector::OPTIONS {
            let selector: ChannelSelector = option.parse().unwrap();
            assert_eq!(selector.to_string(), option);
        }
        assert!("c4".parse::<ChannelSelector>().is_err());
        assert!("ALL".parse::<ChannelSelector>().is_err());
    }

    #[test]
    fn test_selector_range() {
        assert_eq!(ChannelSelector::All.range(4).unwrap(), 0..4);
        assert_eq!(ChannelSelector::C2.range(4).unwrap(), 2..3);
        assert!(matches!(
            ChannelSelector::C3.range(3),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_with_samples_keeps_metadata() {
        let mut latent = Latent::new(SampleTensor::zeros((1, 4, 2, 2)));
        latent
            .metadata
            .insert("batch_index".to_string(), Value::from(vec![0]));

        let next = latent.with_samples(SampleTensor::ones((1, 4, 2, 2)));
        assert_eq!(next.metadata, latent.metadata);
        assert!(latent.samples.iter().all(|&v| v == 0.0));
    }
}
