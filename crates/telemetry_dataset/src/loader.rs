//! CSV loading and writing of labelled telemetry windows.
//!
//! Each row carries two cells, `features` and `labels`, holding serialized arrays:
//! a `steps x channels` window and a `1 x 1` label.

use crate::parse::parse_array;
use crate::types::{DatasetError, DatasetResult, WindowSet};
use data_contracts::{validate_label, FeatureSchema, WindowShape};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize, Serialize)]
struct WindowRecord {
    features: String,
    labels: String,
}

/// How raw windows on disk map to model windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    /// Raw window length in samples (`data_seg`).
    pub data_seg: usize,
    /// Keep every `sample_rate`-th step.
    pub sample_rate: usize,
}

impl WindowSpec {
    pub fn new(data_seg: usize, sample_rate: usize) -> Self {
        Self {
            data_seg,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Effective window length fed to the model.
    pub fn window_len(&self) -> usize {
        self.data_seg / self.sample_rate
    }
}

/// Load every row of `path`, validating each window against `schema`.
///
/// Windows of `data_seg` steps are decimated to `window_len`; windows that are
/// already `window_len` long are kept as-is. Anything else is a shape error.
pub fn load_windows(
    path: &Path,
    schema: &FeatureSchema,
    spec: WindowSpec,
) -> DatasetResult<WindowSet> {
    schema.validate()?;
    let shape = WindowShape::new(spec.window_len(), schema.width());
    let mut reader = csv::Reader::from_path(path).map_err(|source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    let mut features = Vec::new();
    let mut labels = Vec::new();
    for (row, record) in reader.deserialize::<WindowRecord>().enumerate() {
        let record = record.map_err(|source| DatasetError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_err = |msg: String| DatasetError::Parse {
            path: path.to_path_buf(),
            row,
            msg,
        };
        let contract_err = |source| DatasetError::Contract {
            path: path.to_path_buf(),
            row,
            source,
        };

        let window = parse_array(&record.features).map_err(&parse_err)?;
        let stride = if window.rows == shape.steps {
            1
        } else if window.rows == spec.data_seg {
            spec.sample_rate
        } else {
            return Err(contract_err(data_contracts::ContractError::WindowShape {
                expected: (shape.steps, shape.channels),
                found: (window.rows, window.cols),
            }));
        };
        if window.cols != shape.channels {
            return Err(contract_err(data_contracts::ContractError::WindowShape {
                expected: (shape.steps, shape.channels),
                found: (window.rows, window.cols),
            }));
        }
        for step in (0..window.rows).step_by(stride).take(shape.steps) {
            let start = step * window.cols;
            features.extend_from_slice(&window.values[start..start + window.cols]);
        }

        let label = parse_array(&record.labels).map_err(&parse_err)?;
        if label.values.len() != 1 {
            return Err(parse_err(format!(
                "expected a single label, found {} values",
                label.values.len()
            )));
        }
        labels.push(validate_label(label.values[0]).map_err(&contract_err)?);
    }

    debug!(path = %path.display(), rows = labels.len(), "loaded telemetry windows");
    WindowSet::new(shape, features, labels)
}

/// Write windows in the same two-column format accepted by [`load_windows`].
pub fn write_windows(path: &Path, set: &WindowSet) -> DatasetResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| DatasetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let csv_err = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    let shape = set.shape();
    for (idx, label) in set.labels().iter().enumerate() {
        let rows: Vec<String> = set
            .window(idx)
            .chunks(shape.channels)
            .map(|row| {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                format!("[{}]", cells.join(", "))
            })
            .collect();
        writer
            .serialize(WindowRecord {
                features: format!("[{}]", rows.join(", ")),
                labels: format!("[[{label}]]"),
            })
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
