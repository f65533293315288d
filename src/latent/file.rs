//! JSON persistence for latents and masks.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

use super::{Latent, Mask};

/// Flat row-major tensor with an explicit shape.
#[derive(Debug, Serialize, Deserialize)]
struct TensorRecord {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl TensorRecord {
    fn check(&self, rank: usize) -> Result<()> {
        if self.shape.len() != rank {
            return Err(Error::shape(
                format!("{rank}D tensor"),
                format!("{}D shape {:?}", self.shape.len(), self.shape),
            ));
        }
        let expected = self
            .shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                Error::shape(
                    "a shape whose element count fits in memory",
                    format!("shape {:?}", self.shape),
                )
            })?;
        if expected != self.data.len() {
            return Err(Error::shape(
                format!("{expected} values for shape {:?}", self.shape),
                format!("{} values", self.data.len()),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LatentRecord {
    samples: TensorRecord,
    #[serde(flatten)]
    metadata: BTreeMap<String, Value>,
}

impl Latent {
    /// Parse a latent from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the shape does not match the data.
    pub fn from_json(json: &str) -> Result<Self> {
        let record: LatentRecord = serde_json::from_str(json)?;
        record.samples.check(4)?;

        let s = &record.samples.shape;
        let samples = Array4::from_shape_vec((s[0], s[1], s[2], s[3]), record.samples.data)
            .map_err(|err| Error::shape(format!("{s:?}"), err.to_string()))?;

        Ok(Self {
            samples,
            metadata: record.metadata,
        })
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let record = LatentRecord {
            samples: TensorRecord {
                shape: self.samples.shape().to_vec(),
                data: self.samples.iter().copied().collect(),
            },
            metadata: self.metadata.clone(),
        };
        Ok(serde_json::to_string(&record)?)
    }
}

/// Parse a mask from its JSON representation.
fn mask_from_json(json: &str) -> Result<Mask> {
    let record: TensorRecord = serde_json::from_str(json)?;
    record.check(3)?;

    let s = &record.shape;
    Array3::from_shape_vec((s[0], s[1], s[2]), record.data)
        .map_err(|err| Error::shape(format!("{s:?}"), err.to_string()))
}

/// Load a latent from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_latent<P: AsRef<Path>>(path: P) -> Result<Latent> {
    let json = fs::read_to_string(path.as_ref())?;
    Latent::from_json(&json)
}

/// Save a latent as a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_latent<P: AsRef<Path>>(latent: &Latent, path: P) -> Result<()> {
    fs::write(path.as_ref(), latent.to_json()?)?;
    Ok(())
}

/// Load a mask from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_mask<P: AsRef<Path>>(path: P) -> Result<Mask> {
    let json = fs::read_to_string(path.as_ref())?;
    mask_from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_survives_json() {
        let json = r#"{
            "samples": {"shape": [1, 2, 1, 2], "data": [0.0, 1.0, 2.0, 3.0]},
            "batch_index": [0],
            "note": "kept"
        }"#;

        let latent = Latent::from_json(json).unwrap();
        assert_eq!(latent.dim(), (1, 2, 1, 2));
        assert_eq!(latent.samples[[0, 1, 0, 1]], 3.0);
        assert_eq!(latent.metadata["note"], Value::from("kept"));

        let reparsed = Latent::from_json(&latent.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, latent);
    }

    #[test]
    fn test_shape_data_disagreement() {
        let json = r#"{"samples": {"shape": [1, 1, 2, 2], "data": [0.0, 1.0]}}"#;
        assert!(matches!(
            Latent::from_json(json),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_shape_product_overflow() {
        let json = format!(
            r#"{{"samples": {{"shape": [{}, 2, 1, 1], "data": []}}}}"#,
            usize::MAX
        );
        assert!(matches!(
            Latent::from_json(&json),
            Err(Error::ShapeMismatch { .. })
        ));
        let mask = format!(r#"{{"shape": [{}, 4, 4], "data": []}}"#, usize::MAX / 2);
        assert!(matches!(
            mask_from_json(&mask),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_rank() {
        let json = r#"{"samples": {"shape": [2, 2], "data": [0.0, 1.0, 2.0, 3.0]}}"#;
        assert!(matches!(
            Latent::from_json(json),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_mask_parse() {
        let mask = mask_from_json(r#"{"shape": [1, 1, 3], "data": [0.0, 0.5, 1.0]}"#).unwrap();
        assert_eq!(mask.dim(), (1, 1, 3));
        assert_eq!(mask[[0, 0, 1]], 0.5);
    }
}
