use data_contracts::FeatureSchema;
use telemetry_dataset::{load_windows, split_dev_test, NormStats, WindowSet};
use tracing::info;

use crate::config::RunConfig;

/// Normalized train/dev/test splits and the statistics fitted on train.
#[derive(Debug, Clone)]
pub struct PreparedSplits {
    pub schema: FeatureSchema,
    pub stats: NormStats,
    pub train: WindowSet,
    pub dev: WindowSet,
    pub test: WindowSet,
}

impl PreparedSplits {
    /// Read the training CSV and the held-out pool named by `cfg`.
    pub fn load(cfg: &RunConfig, schema: &FeatureSchema) -> anyhow::Result<Self> {
        let train = load_windows(&cfg.dataset, schema, cfg.window_spec()).map_err(|e| {
            anyhow::anyhow!("failed to load training data {}: {e}", cfg.dataset.display())
        })?;
        let pool = load_windows(&cfg.test_dataset, schema, cfg.window_spec()).map_err(|e| {
            anyhow::anyhow!(
                "failed to load held-out data {}: {e}",
                cfg.test_dataset.display()
            )
        })?;
        Self::from_raw(schema.clone(), train, pool, cfg.seed)
    }

    /// Split `pool` into dev/test with `seed`, fit stats on `train` and
    /// normalize all three splits with them.
    pub fn from_raw(
        schema: FeatureSchema,
        train: WindowSet,
        pool: WindowSet,
        seed: u64,
    ) -> anyhow::Result<Self> {
        if train.is_empty() {
            anyhow::bail!("training split is empty");
        }
        if pool.len() < 2 {
            anyhow::bail!(
                "held-out pool needs at least 2 windows for a dev/test split, found {}",
                pool.len()
            );
        }
        if train.shape() != pool.shape() {
            anyhow::bail!(
                "training windows {:?} and held-out windows {:?} differ in shape",
                train.shape(),
                pool.shape()
            );
        }
        let (dev, test) = split_dev_test(&pool, seed);
        let stats = NormStats::fit(&train);
        let splits = Self {
            train: stats.apply(&train)?,
            dev: stats.apply(&dev)?,
            test: stats.apply(&test)?,
            stats,
            schema,
        };
        info!(
            train = splits.train.len(),
            train_pos = splits.train.positives(),
            dev = splits.dev.len(),
            dev_pos = splits.dev.positives(),
            test = splits.test.len(),
            test_pos = splits.test.positives(),
            "prepared splits"
        );
        Ok(splits)
    }
}
