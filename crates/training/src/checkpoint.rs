//! Checkpoint persistence and best-F1 model selection.
//!
//! A run keeps at most one checkpoint: `<artifact_dir>/<run_name>.bin` (burn record)
//! with a JSON sidecar `<run_name>.meta.json` carrying everything needed to
//! rebuild and feed the model in another process.

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use data_contracts::FeatureSchema;
use models::{VssModel, VssModelConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use telemetry_dataset::NormStats;
use tracing::info;

use crate::metrics::SplitMetrics;

/// File locations of one run's artifacts, keyed by run name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    dir: PathBuf,
    run_name: String,
}

impl ArtifactPaths {
    pub fn new(dir: &Path, run_name: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            run_name: run_name.to_string(),
        }
    }

    pub fn checkpoint(&self) -> PathBuf {
        self.dir.join(format!("{}.bin", self.run_name))
    }

    pub fn meta(&self) -> PathBuf {
        self.dir.join(format!("{}.meta.json", self.run_name))
    }

    pub fn metrics_log(&self) -> PathBuf {
        self.dir.join(format!("{}.metrics.jsonl", self.run_name))
    }

    pub fn predictions(&self) -> PathBuf {
        self.dir.join(format!("{}.predictions.csv", self.run_name))
    }

    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            anyhow::anyhow!(
                "failed to create artifact dir {}: {e}",
                self.dir.display()
            )
        })
    }
}

/// Epoch and development scores of the retained checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestCheckpoint {
    pub epoch: usize,
    pub f1: f64,
    pub accuracy: f64,
}

/// Sidecar written next to the model record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub run_name: String,
    pub best: Option<BestCheckpoint>,
    pub model: VssModelConfig,
    pub schema: FeatureSchema,
    pub data_seg: usize,
    pub sample_rate: usize,
    pub window_len: usize,
    pub lab_seg: usize,
    pub norm: NormStats,
}

impl CheckpointMeta {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read(path).map_err(|e| {
            anyhow::anyhow!("failed to read checkpoint metadata {}: {e}", path.display())
        })?;
        serde_json::from_slice(&raw).map_err(|e| {
            anyhow::anyhow!("invalid checkpoint metadata {}: {e}", path.display())
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json).map_err(|e| {
            anyhow::anyhow!("failed to write checkpoint metadata {}: {e}", path.display())
        })
    }
}

pub fn save_model<B: Backend>(model: &VssModel<B>, path: &Path) -> anyhow::Result<()> {
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path.to_path_buf(), &recorder)
        .map_err(|e| anyhow::anyhow!("failed to save checkpoint: {e}"))
}

/// Rebuild the model described by the sidecar and load the stored weights.
///
/// A missing checkpoint is an error, never a freshly initialised model.
pub fn load_checkpoint<B: Backend>(
    paths: &ArtifactPaths,
    device: &B::Device,
) -> anyhow::Result<(VssModel<B>, CheckpointMeta)> {
    let ckpt = paths.checkpoint();
    if !ckpt.exists() {
        anyhow::bail!(
            "checkpoint {} not found; run `train` first or point --artifact-dir/--run-name at an existing run",
            ckpt.display()
        );
    }
    let meta = CheckpointMeta::load(&paths.meta())?;
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    let model = VssModel::<B>::new(&meta.model, device)
        .load_file(ckpt.clone(), &recorder, device)
        .map_err(|e| anyhow::anyhow!("failed to load checkpoint {}: {e}", ckpt.display()))?;
    Ok((model, meta))
}

/// Keeps the checkpoint with the best development F1 seen so far.
///
/// Ties go to the later epoch. The first epoch always saves, so every completed
/// run leaves exactly one checkpoint behind.
pub struct ModelSelector {
    paths: ArtifactPaths,
    meta: CheckpointMeta,
}

impl ModelSelector {
    pub fn new(paths: ArtifactPaths, meta: CheckpointMeta) -> Self {
        Self {
            paths,
            meta: CheckpointMeta { best: None, ..meta },
        }
    }

    pub fn improves(&self, f1: f64) -> bool {
        match self.meta.best {
            None => true,
            Some(best) => f1 >= best.f1,
        }
    }

    /// Persist `model` when `dev` is at least as good as the best so far.
    pub fn consider<B: Backend>(
        &mut self,
        epoch: usize,
        dev: &SplitMetrics,
        model: &VssModel<B>,
    ) -> anyhow::Result<bool> {
        if !self.improves(dev.f1) {
            return Ok(false);
        }
        let best = BestCheckpoint {
            epoch,
            f1: dev.f1,
            accuracy: dev.accuracy,
        };
        self.paths.ensure_dir()?;
        save_model(model, &self.paths.checkpoint())?;
        self.meta.best = Some(best);
        self.meta.save(&self.paths.meta())?;
        info!(
            epoch,
            f1 = dev.f1,
            path = %self.paths.checkpoint().display(),
            "saved checkpoint"
        );
        Ok(true)
    }

    pub fn best(&self) -> Option<BestCheckpoint> {
        self.meta.best
    }
}
