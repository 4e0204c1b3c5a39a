//! Core types and error definitions for telemetry_dataset.

use data_contracts::{ContractError, WindowShape};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("row {row} in {path}: {msg}")]
    Parse {
        path: PathBuf,
        row: usize,
        msg: String,
    },
    #[error("row {row} in {path}: {source}")]
    Contract {
        path: PathBuf,
        row: usize,
        #[source]
        source: ContractError,
    },
    #[error(transparent)]
    Shape(#[from] ContractError),
    #[error("{0}")]
    Other(String),
}

/// An immutable split of telemetry windows, stored row-major as `[n, steps, channels]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    shape: WindowShape,
    features: Vec<f32>,
    labels: Vec<f32>,
}

impl WindowSet {
    pub fn new(shape: WindowShape, features: Vec<f32>, labels: Vec<f32>) -> DatasetResult<Self> {
        if features.len() != labels.len() * shape.len() {
            return Err(DatasetError::Other(format!(
                "feature buffer of {} values does not hold {} windows of {}x{}",
                features.len(),
                labels.len(),
                shape.steps,
                shape.channels
            )));
        }
        Ok(Self {
            shape,
            features,
            labels,
        })
    }

    pub fn shape(&self) -> WindowShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> &[f32] {
        &self.features
    }

    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    pub fn window(&self, idx: usize) -> &[f32] {
        let len = self.shape.len();
        &self.features[idx * len..(idx + 1) * len]
    }

    pub fn positives(&self) -> usize {
        self.labels
            .iter()
            .filter(|l| data_contracts::is_positive(**l))
            .count()
    }

    /// Gather the windows at `indices`, in order.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut features = Vec::with_capacity(indices.len() * self.shape.len());
        let mut labels = Vec::with_capacity(indices.len());
        for &idx in indices {
            features.extend_from_slice(self.window(idx));
            labels.push(self.labels[idx]);
        }
        Self {
            shape: self.shape,
            features,
            labels,
        }
    }

    pub(crate) fn with_features(&self, features: Vec<f32>) -> Self {
        Self {
            shape: self.shape,
            features,
            labels: self.labels.clone(),
        }
    }
}
