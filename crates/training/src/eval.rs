//! Test-split evaluation of a stored checkpoint.

use burn::tensor::backend::Backend;
use models::VssModel;
use serde::{Deserialize, Serialize};
use std::path::Path;
use telemetry_dataset::WindowSet;

use crate::checkpoint::{load_checkpoint, ArtifactPaths, CheckpointMeta};
use crate::metrics::{SplitMetrics, DECISION_THRESHOLD};
use crate::trainer::evaluate_split;

/// Column order of [`TestReport::table_line`].
pub const REPORT_HEADER: &str = "loss n_acc precision recall fpr fnr acc F1";

/// One test window's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted: u8,
    pub actual: u8,
    pub probability: f32,
}

#[derive(Debug, Clone)]
pub struct TestReport {
    pub metrics: SplitMetrics,
    pub predictions: Vec<Prediction>,
}

impl TestReport {
    pub fn new(metrics: SplitMetrics, probabilities: &[f32], labels: &[f32]) -> Self {
        let predictions = probabilities
            .iter()
            .zip(labels)
            .map(|(&p, &l)| Prediction {
                predicted: u8::from(p >= DECISION_THRESHOLD),
                actual: u8::from(data_contracts::is_positive(l)),
                probability: p,
            })
            .collect();
        Self {
            metrics,
            predictions,
        }
    }

    /// Metrics in [`REPORT_HEADER`] order, three decimals each.
    pub fn table_line(&self) -> String {
        self.metrics
            .report_values()
            .iter()
            .map(|v| format!("{v:.3}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn render(&self) -> String {
        format!(
            "{REPORT_HEADER}\n{}\nResult: {:.3}",
            self.table_line(),
            self.metrics.f1
        )
    }

    pub fn write_predictions(&self, path: &Path) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", path.display()))?;
        for row in &self.predictions {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// A reloaded checkpoint plus the metadata needed to feed it.
pub struct Evaluator<B: Backend> {
    model: VssModel<B>,
    meta: CheckpointMeta,
    device: B::Device,
}

impl<B: Backend> Evaluator<B> {
    pub fn load(paths: &ArtifactPaths, device: &B::Device) -> anyhow::Result<Self> {
        let (model, meta) = load_checkpoint::<B>(paths, device)?;
        if model.tower_channels() != meta.schema.family_ranges() {
            anyhow::bail!(
                "checkpoint {} has towers over {:?} but its schema has families {:?}",
                paths.checkpoint().display(),
                model.tower_channels(),
                meta.schema.family_ranges()
            );
        }
        Ok(Self {
            model,
            meta,
            device: device.clone(),
        })
    }

    pub fn meta(&self) -> &CheckpointMeta {
        &self.meta
    }

    /// Score windows that were already normalized with the checkpoint's stats.
    pub fn evaluate_normalized(
        &self,
        set: &WindowSet,
        batch_size: usize,
    ) -> anyhow::Result<TestReport> {
        let expected = (self.meta.window_len, self.meta.schema.width());
        let found = (set.shape().steps, set.shape().channels);
        if expected != found {
            anyhow::bail!(
                "checkpoint expects windows of {expected:?} (steps, channels), got {found:?}"
            );
        }
        let (metrics, probabilities) =
            evaluate_split(&self.model, set, batch_size, &self.device)?;
        Ok(TestReport::new(metrics, &probabilities, set.labels()))
    }

    /// Normalize raw windows with the stored stats, then score them.
    pub fn evaluate_raw(&self, set: &WindowSet, batch_size: usize) -> anyhow::Result<TestReport> {
        let normalized = self.meta.norm.apply(set)?;
        self.evaluate_normalized(&normalized, batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ConfusionMatrix;

    fn report() -> TestReport {
        let mut cm = ConfusionMatrix::default();
        let probs = [0.9, 0.2, 0.6, 0.4];
        let labels = [1.0, 0.0, 0.0, 1.0];
        for (p, l) in probs.iter().zip(&labels) {
            cm.record(*p, *l);
        }
        TestReport::new(SplitMetrics::from_confusion(0.25, cm), &probs, &labels)
    }

    #[test]
    fn predictions_follow_threshold() {
        let r = report();
        let predicted: Vec<u8> = r.predictions.iter().map(|p| p.predicted).collect();
        let actual: Vec<u8> = r.predictions.iter().map(|p| p.actual).collect();
        assert_eq!(predicted, vec![1, 0, 1, 0]);
        assert_eq!(actual, vec![1, 0, 0, 1]);
    }

    #[test]
    fn render_has_header_table_and_result() {
        let text = report().render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], REPORT_HEADER);
        assert_eq!(lines[1].split_whitespace().count(), 8);
        assert!(lines[1].starts_with("0.250 "));
        assert_eq!(lines[2], "Result: 0.500");
    }

    #[test]
    fn predictions_csv_has_one_row_per_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preds.csv");
        report().write_predictions(&path).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["predicted", "actual", "probability"]
        );
        assert_eq!(reader.records().count(), 4);
    }
}
