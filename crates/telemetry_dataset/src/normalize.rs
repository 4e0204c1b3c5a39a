//! Per-channel z-score normalization fitted on the training split.

use crate::types::{DatasetError, DatasetResult, WindowSet};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Added to the standard deviation before dividing.
pub const STD_EPSILON: f32 = 1e-5;

/// Channel statistics fitted once on the training split and reused verbatim for
/// development, test and later inference.
///
/// Channels whose every value is missing keep NaN statistics; they serialize as
/// JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormStats {
    #[serde(serialize_with = "nan_as_null", deserialize_with = "null_as_nan")]
    pub mean: Vec<f32>,
    #[serde(serialize_with = "nan_as_null", deserialize_with = "null_as_nan")]
    pub std: Vec<f32>,
}

impl NormStats {
    /// NaN-ignoring mean and population standard deviation per channel over all
    /// `(window, step)` positions.
    pub fn fit(set: &WindowSet) -> Self {
        let channels = set.shape().channels;
        let mut count = vec![0u64; channels];
        let mut sum = vec![0f64; channels];
        for row in set.features().chunks(channels) {
            for (c, v) in row.iter().enumerate() {
                if !v.is_nan() {
                    count[c] += 1;
                    sum[c] += *v as f64;
                }
            }
        }
        let mean: Vec<f64> = sum
            .iter()
            .zip(&count)
            .map(|(s, n)| if *n == 0 { f64::NAN } else { s / *n as f64 })
            .collect();

        let mut sq = vec![0f64; channels];
        for row in set.features().chunks(channels) {
            for (c, v) in row.iter().enumerate() {
                if !v.is_nan() {
                    let d = *v as f64 - mean[c];
                    sq[c] += d * d;
                }
            }
        }
        let std = sq
            .iter()
            .zip(&count)
            .map(|(s, n)| {
                if *n == 0 {
                    f32::NAN
                } else {
                    (s / *n as f64).sqrt() as f32
                }
            })
            .collect();

        Self {
            mean: mean.into_iter().map(|m| m as f32).collect(),
            std,
        }
    }

    pub fn channels(&self) -> usize {
        self.mean.len()
    }

    /// `(x - mean) / (std + 1e-5)` per channel. NaN inputs stay NaN.
    pub fn apply(&self, set: &WindowSet) -> DatasetResult<WindowSet> {
        let channels = set.shape().channels;
        if channels != self.channels() || self.std.len() != self.channels() {
            return Err(DatasetError::Other(format!(
                "normalization stats cover {} channels, windows have {channels}",
                self.channels()
            )));
        }
        let features = set
            .features()
            .chunks(channels)
            .flat_map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.std))
                    .map(|(v, (m, s))| (v - m) / (s + STD_EPSILON))
            })
            .collect();
        Ok(set.with_features(features))
    }
}

fn nan_as_null<S: Serializer>(values: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
    let opt: Vec<Option<f32>> = values
        .iter()
        .map(|v| if v.is_nan() { None } else { Some(*v) })
        .collect();
    opt.serialize(serializer)
}

fn null_as_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
    let opt: Vec<Option<f32>> = Vec::deserialize(deserializer)?;
    Ok(opt.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
}
