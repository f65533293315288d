//! Post-processing options shared by every filter.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::latent::{Latent, SampleTensor, DOWNSCALE_RATIO, DOWNSCALE_RATIO_KEY};

/// Numerical-stability clamp applied after the tone adjustments
/// (brightness, contrast, exposure, gamma, invert, levels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyClamp {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl Default for SafetyClamp {
    fn default() -> Self {
        Self {
            min: -10.0,
            max: 10.0,
        }
    }
}

impl SafetyClamp {
    /// Check that the bounds are finite and ordered.
    ///
    /// # Errors
    ///
    /// Returns an error if either bound is not finite or `min > max`.
    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(Error::invalid("safety_clamp", "bounds must be finite"));
        }
        if self.min > self.max {
            return Err(Error::invalid(
                "safety_clamp",
                format!("min {} is greater than max {}", self.min, self.max),
            ));
        }
        Ok(())
    }

    /// Clamp every element in place.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving `samples` untouched, if the bounds are invalid.
    pub fn apply(&self, samples: &mut SampleTensor) -> Result<()> {
        self.validate()?;
        let (min, max) = (self.min, self.max);
        samples.mapv_inplace(|v| v.clamp(min, max));
        Ok(())
    }
}

/// Configuration for filter post-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Clamp applied after tone adjustments. `None` leaves their output unbounded.
    pub safety_clamp: Option<SafetyClamp>,

    /// Record `downscale_ratio_spacial = 8` in every output container.
    pub tag_downscale_ratio: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            safety_clamp: Some(SafetyClamp::default()),
            tag_downscale_ratio: false,
        }
    }
}

impl FilterConfig {
    /// Configuration without the safety clamp.
    #[must_use]
    pub fn unclamped() -> Self {
        Self {
            safety_clamp: None,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the clamp bounds are not finite or are inverted.
    pub fn validate(&self) -> Result<()> {
        self.safety_clamp.as_ref().map_or(Ok(()), SafetyClamp::validate)
    }

    /// Apply the safety clamp, if enabled.
    pub(crate) fn clamp(&self, samples: &mut SampleTensor) -> Result<()> {
        match &self.safety_clamp {
            Some(clamp) => clamp.apply(samples),
            None => Ok(()),
        }
    }

    /// Apply container-level post-processing to a node's output.
    #[must_use]
    pub fn finish(&self, mut latent: Latent) -> Latent {
        if self.tag_downscale_ratio {
            latent
                .metadata
                .insert(DOWNSCALE_RATIO_KEY.to_string(), DOWNSCALE_RATIO.into());
        }
        latent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FilterConfig::default().validate().is_ok());
        assert!(FilterConfig::unclamped().validate().is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let config = FilterConfig {
            safety_clamp: Some(SafetyClamp { min: 1.0, max: -1.0 }),
            ..FilterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_apply_rejects_bad_bounds() {
        let mut samples = SampleTensor::from_elem((1, 1, 2, 2), 3.0);
        for clamp in [
            SafetyClamp { min: 1.0, max: -1.0 },
            SafetyClamp { min: f32::NAN, max: 1.0 },
            SafetyClamp { min: -1.0, max: f32::INFINITY },
        ] {
            assert!(clamp.apply(&mut samples).is_err(), "{clamp:?}");
        }
        assert!(samples.iter().all(|&v| v == 3.0));

        SafetyClamp { min: -1.0, max: 1.0 }.apply(&mut samples).unwrap();
        assert!(samples.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_finish_tags_ratio() {
        let config = FilterConfig {
            tag_downscale_ratio: true,
            ..FilterConfig::default()
        };
        let latent = config.finish(Latent::new(SampleTensor::zeros((1, 4, 1, 1))));
        assert_eq!(latent.metadata[DOWNSCALE_RATIO_KEY], 8);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: FilterConfig =
            serde_json::from_str(r#"{"tag_downscale_ratio": true}"#).unwrap();
        assert_eq!(config.safety_clamp, Some(SafetyClamp::default()));
        assert!(config.tag_downscale_ratio);
    }
}
