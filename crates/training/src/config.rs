use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use telemetry_dataset::WindowSpec;

use crate::checkpoint::ArtifactPaths;

/// Immutable configuration of one training run, built once at startup and passed
/// by reference to the components that need it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Training CSV.
    pub dataset: PathBuf,
    /// Held-out CSV, split 50/50 into development and test.
    pub test_dataset: PathBuf,
    /// Prefer the accelerator backend when it was compiled in.
    pub use_accelerator: bool,
    pub seed: u64,
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Raw window length in samples.
    pub data_seg: usize,
    /// Label horizon in seconds. Recorded with the checkpoint, not used by training.
    pub lab_seg: usize,
    pub sample_rate: usize,
    /// Dropout between stacked recurrent layers.
    pub dropout: f64,
    pub run_name: String,
    pub artifact_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            dataset: data_dir.join("train.csv"),
            test_dataset: data_dir.join("test.csv"),
            use_accelerator: true,
            seed: 2024,
            batch_size: 128,
            epochs: 50,
            learning_rate: 1e-3,
            data_seg: 30,
            lab_seg: 5,
            sample_rate: 1,
            dropout: 0.0,
            run_name: "vss".to_string(),
            artifact_dir: PathBuf::from("models"),
        }
    }
}

/// On-disk TOML layout; every key is optional and falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RunConfigFile {
    pub(crate) dataset: Option<PathBuf>,
    pub(crate) test_dataset: Option<PathBuf>,
    pub(crate) use_accelerator: Option<bool>,
    pub(crate) seed: Option<u64>,
    pub(crate) batch_size: Option<usize>,
    pub(crate) epochs: Option<usize>,
    pub(crate) learning_rate: Option<f64>,
    pub(crate) data_seg: Option<usize>,
    pub(crate) lab_seg: Option<usize>,
    pub(crate) sample_rate: Option<usize>,
    pub(crate) dropout: Option<f64>,
    pub(crate) run_name: Option<String>,
    pub(crate) artifact_dir: Option<PathBuf>,
}

impl RunConfigFile {
    pub(crate) fn apply(self, cfg: &mut RunConfig) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { cfg.$field = v; })*
            };
        }
        take!(
            dataset,
            test_dataset,
            use_accelerator,
            seed,
            batch_size,
            epochs,
            learning_rate,
            data_seg,
            lab_seg,
            sample_rate,
            dropout,
            run_name,
            artifact_dir
        );
    }
}

impl RunConfig {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let file: RunConfigFile = toml::from_str(raw)?;
        let mut cfg = Self::default();
        file.apply(&mut cfg);
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        Self::from_toml_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be positive");
        }
        if self.epochs == 0 {
            anyhow::bail!("epochs must be positive");
        }
        if self.sample_rate == 0 {
            anyhow::bail!("sample_rate must be positive");
        }
        if self.sample_rate > self.data_seg {
            anyhow::bail!(
                "sample_rate {} exceeds data_seg {}; the window would be empty",
                self.sample_rate,
                self.data_seg
            );
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            anyhow::bail!("learning_rate must be a positive number");
        }
        if !(0.0..1.0).contains(&self.dropout) {
            anyhow::bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if self.run_name.trim().is_empty() {
            anyhow::bail!("run_name must not be empty");
        }
        Ok(())
    }

    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec::new(self.data_seg, self.sample_rate)
    }

    /// Effective window length `data_seg / sample_rate`.
    pub fn window_len(&self) -> usize {
        self.window_spec().window_len()
    }

    pub fn artifacts(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.artifact_dir, &self.run_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RunConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.window_len(), 30);
    }

    #[test]
    fn window_len_uses_sample_rate() {
        let cfg = RunConfig {
            sample_rate: 3,
            ..Default::default()
        };
        assert_eq!(cfg.window_len(), 10);
    }

    #[test]
    fn invalid_values_rejected() {
        for cfg in [
            RunConfig {
                batch_size: 0,
                ..Default::default()
            },
            RunConfig {
                sample_rate: 31,
                ..Default::default()
            },
            RunConfig {
                dropout: 1.0,
                ..Default::default()
            },
            RunConfig {
                learning_rate: f64::NAN,
                ..Default::default()
            },
        ] {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }
}
