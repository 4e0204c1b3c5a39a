//! Epoch-driven optimisation of the VSS model.

use burn::module::AutodiffModule;
use burn::optim::{AdamWConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use models::{VssModel, VssModelConfig};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use telemetry_dataset::{BatchIter, WindowSet};
use tracing::{debug, info};

use crate::checkpoint::{BestCheckpoint, CheckpointMeta, ModelSelector};
use crate::clip::clip_grad_norm;
use crate::config::RunConfig;
use crate::dataset::PreparedSplits;
use crate::metrics::{MetricAccumulator, SplitMetrics};

/// Learning-rate multiplier applied once per epoch.
pub const LR_DECAY: f64 = 0.99;
/// Ceiling on the global gradient norm across all parameters.
pub const GRAD_CLIP_NORM: f32 = 0.5;
pub const WEIGHT_DECAY: f32 = 0.01;
/// Probabilities are clamped to `[EPS, 1 - EPS]` before the log.
const BCE_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Serialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub learning_rate: f64,
    pub train: SplitMetrics,
    pub dev: SplitMetrics,
    pub checkpointed: bool,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub best: BestCheckpoint,
    pub epochs: Vec<EpochReport>,
}

pub fn model_config(cfg: &RunConfig, splits: &PreparedSplits) -> VssModelConfig {
    VssModelConfig {
        family_widths: splits.schema.family_widths(),
        dropout: cfg.dropout,
        ..Default::default()
    }
}

/// Mean binary cross-entropy of probabilities against `{0, 1}` targets.
pub fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let probs = probs.clamp(BCE_EPS, 1.0 - BCE_EPS);
    let positive = targets.clone() * probs.clone().log();
    let negative = targets.neg().add_scalar(1.0) * probs.neg().add_scalar(1.0).log();
    (positive + negative).neg().mean()
}

pub(crate) fn host_values<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
) -> anyhow::Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("failed to read tensor data: {e:?}"))
}

/// One no-gradient pass over `set`, returning metrics and per-window probabilities.
pub fn evaluate_split<B: Backend>(
    model: &VssModel<B>,
    set: &WindowSet,
    batch_size: usize,
    device: &B::Device,
) -> anyhow::Result<(SplitMetrics, Vec<f32>)> {
    let mut acc = MetricAccumulator::default();
    let mut probabilities = Vec::with_capacity(set.len());
    let mut iter = BatchIter::sequential(set);
    while let Some(batch) = iter.next_batch::<B>(batch_size, device) {
        let probs = model.forward(batch.features);
        let loss = host_values(binary_cross_entropy(probs.clone(), batch.labels))?;
        let probs = host_values(probs)?;
        acc.record_batch(
            loss.first().copied().unwrap_or(0.0),
            &probs,
            &batch.label_values,
        );
        probabilities.extend(probs);
    }
    Ok((acc.finish(), probabilities))
}

/// Train for `cfg.epochs` epochs, checkpointing the best development F1.
pub fn train<B: AutodiffBackend>(
    cfg: &RunConfig,
    splits: &PreparedSplits,
    device: &B::Device,
) -> anyhow::Result<TrainOutcome> {
    let model_cfg = model_config(cfg, splits);
    let mut model = VssModel::<B>::new(&model_cfg, device);
    if model.tower_channels() != splits.schema.family_ranges() {
        anyhow::bail!(
            "tower channel ranges {:?} disagree with schema families {:?}",
            model.tower_channels(),
            splits.schema.family_ranges()
        );
    }
    let mut optim = AdamWConfig::new().with_weight_decay(WEIGHT_DECAY).init();

    let paths = cfg.artifacts();
    paths.ensure_dir()?;
    let mut selector = ModelSelector::new(
        paths.clone(),
        CheckpointMeta {
            run_name: cfg.run_name.clone(),
            best: None,
            model: model_cfg,
            schema: splits.schema.clone(),
            data_seg: cfg.data_seg,
            sample_rate: cfg.sample_rate,
            window_len: cfg.window_len(),
            lab_seg: cfg.lab_seg,
            norm: splits.stats.clone(),
        },
    );
    let mut metrics_log = MetricsLog::create(&paths.metrics_log())?;

    let mut lr = cfg.learning_rate;
    let mut epochs = Vec::with_capacity(cfg.epochs);
    for epoch in 0..cfg.epochs {
        let epoch_lr = lr;
        let mut acc = MetricAccumulator::default();
        let mut iter = BatchIter::shuffled(&splits.train, cfg.seed.wrapping_add(epoch as u64));
        while let Some(batch) = iter.next_batch::<B>(cfg.batch_size, device) {
            let probs = model.forward(batch.features);
            let loss = binary_cross_entropy(probs.clone(), batch.labels);
            let loss_value = host_values(loss.clone().detach())?
                .first()
                .copied()
                .unwrap_or(f32::NAN);
            if !loss_value.is_finite() {
                anyhow::bail!(
                    "non-finite training loss {loss_value} at epoch {epoch}, batch {}",
                    acc.batches()
                );
            }
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            let (grads, grad_norm) = clip_grad_norm::<B, _>(&model, grads, GRAD_CLIP_NORM);
            if !grad_norm.is_finite() {
                anyhow::bail!(
                    "non-finite gradient norm at epoch {epoch}, batch {}",
                    acc.batches()
                );
            }
            model = optim.step(lr, model, grads);

            let probs = host_values(probs.detach())?;
            acc.record_batch(loss_value, &probs, &batch.label_values);
        }
        lr *= LR_DECAY;

        let train_metrics = acc.finish();
        debug!(
            epoch,
            predicted_positive = train_metrics.confusion.predicted_positive(),
            actual_positive = train_metrics.confusion.actual_positive(),
            "train confusion"
        );
        info!("Step {epoch} batches {}: Train- {}", acc.batches(), train_metrics.summary());

        let (dev_metrics, _) =
            evaluate_split(&model.valid(), &splits.dev, cfg.batch_size, device)?;
        debug!(
            epoch,
            predicted_positive = dev_metrics.confusion.predicted_positive(),
            actual_positive = dev_metrics.confusion.actual_positive(),
            "dev confusion"
        );
        info!("Step {epoch}: Dev- {}", dev_metrics.summary());

        let checkpointed = selector.consider(epoch, &dev_metrics, &model)?;
        let report = EpochReport {
            epoch,
            learning_rate: epoch_lr,
            train: train_metrics,
            dev: dev_metrics,
            checkpointed,
        };
        metrics_log.append(&report)?;
        epochs.push(report);
    }

    let best = selector
        .best()
        .ok_or_else(|| anyhow::anyhow!("no epoch completed; nothing was checkpointed"))?;
    info!(
        "best epoch: {} max F1:{:.3} acc: {:.3}",
        best.epoch, best.f1, best.accuracy
    );
    Ok(TrainOutcome { best, epochs })
}

/// Appends one JSON object per epoch.
struct MetricsLog {
    writer: BufWriter<File>,
}

impl MetricsLog {
    fn create(path: &std::path::Path) -> anyhow::Result<Self> {
        let file = File::create(path)
            .map_err(|e| anyhow::anyhow!("failed to create metrics log {}: {e}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn append(&mut self, report: &EpochReport) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    fn tensor(values: Vec<f32>) -> Tensor<B, 2> {
        let n = values.len();
        Tensor::from_data(TensorData::new(values, [n, 1]), &Default::default())
    }

    #[test]
    fn bce_matches_closed_form() {
        let loss = binary_cross_entropy(tensor(vec![0.8, 0.3]), tensor(vec![1.0, 0.0]));
        let value = host_values(loss).unwrap()[0] as f64;
        let expected = -(0.8f64.ln() + 0.7f64.ln()) / 2.0;
        assert!((value - expected).abs() < 1e-5);
    }

    #[test]
    fn bce_stays_finite_at_saturation() {
        let loss = binary_cross_entropy(tensor(vec![0.0, 1.0]), tensor(vec![1.0, 0.0]));
        let value = host_values(loss).unwrap()[0];
        assert!(value.is_finite());
        assert!(value > 10.0);
    }
}
