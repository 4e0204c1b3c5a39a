//! Confusion-matrix metrics shared by the train, dev and test passes.
//!
//! Every ratio whose denominator is zero (no predicted positives, no actual
//! positives, ...) is reported as `0.0` instead of NaN.

use data_contracts::is_positive;
use serde::{Deserialize, Serialize};

/// Probability at or above which a window is predicted positive.
pub const DECISION_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: u64,
    pub tn: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ConfusionMatrix {
    pub fn record(&mut self, probability: f32, label: f32) {
        let predicted = probability >= DECISION_THRESHOLD;
        match (predicted, is_positive(label)) {
            (true, true) => self.tp += 1,
            (false, false) => self.tn += 1,
            (true, false) => self.fp += 1,
            (false, true) => self.fn_ += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.tp + self.tn + self.fp + self.fn_
    }

    pub fn predicted_positive(&self) -> u64 {
        self.tp + self.fp
    }

    pub fn actual_positive(&self) -> u64 {
        self.tp + self.fn_
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn false_positive_rate(&self) -> f64 {
        ratio(self.fp, self.tn + self.fp)
    }

    pub fn false_negative_rate(&self) -> f64 {
        ratio(self.fn_, self.tp + self.fn_)
    }

    /// Share of negative predictions that were right: `tn / (tn + fn)`.
    pub fn negative_accuracy(&self) -> f64 {
        ratio(self.tn, self.tn + self.fn_)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitMetrics {
    pub loss: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    pub fpr: f64,
    pub fnr: f64,
    pub n_acc: f64,
    pub confusion: ConfusionMatrix,
}

impl SplitMetrics {
    pub fn from_confusion(loss: f64, cm: ConfusionMatrix) -> Self {
        Self {
            loss,
            precision: cm.precision(),
            recall: cm.recall(),
            f1: cm.f1(),
            accuracy: cm.accuracy(),
            fpr: cm.false_positive_rate(),
            fnr: cm.false_negative_rate(),
            n_acc: cm.negative_accuracy(),
            confusion: cm,
        }
    }

    /// Values in report order: `loss n_acc precision recall fpr fnr acc F1`.
    pub fn report_values(&self) -> [f64; 8] {
        [
            self.loss,
            self.n_acc,
            self.precision,
            self.recall,
            self.fpr,
            self.fnr,
            self.accuracy,
            self.f1,
        ]
    }

    pub fn summary(&self) -> String {
        format!(
            "loss:{:.4} F1:{:.3} acc:{:.3} precision:{:.3} recall:{:.3}",
            self.loss, self.f1, self.accuracy, self.precision, self.recall
        )
    }
}

/// Collects per-batch losses and predictions over one pass.
#[derive(Debug, Default)]
pub struct MetricAccumulator {
    losses: Vec<f64>,
    confusion: ConfusionMatrix,
}

impl MetricAccumulator {
    pub fn record_batch(&mut self, loss: f32, probabilities: &[f32], labels: &[f32]) {
        self.losses.push(loss as f64);
        for (p, l) in probabilities.iter().zip(labels) {
            self.confusion.record(*p, *l);
        }
    }

    pub fn batches(&self) -> usize {
        self.losses.len()
    }

    /// Mean of the per-batch losses plus confusion-derived ratios.
    pub fn finish(&self) -> SplitMetrics {
        let loss = if self.losses.is_empty() {
            0.0
        } else {
            self.losses.iter().sum::<f64>() / self.losses.len() as f64
        };
        SplitMetrics::from_confusion(loss, self.confusion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(tp: u64, tn: u64, fp: u64, fn_: u64) -> ConfusionMatrix {
        ConfusionMatrix { tp, tn, fp, fn_ }
    }

    #[test]
    fn record_follows_conventions() {
        let mut cm = ConfusionMatrix::default();
        cm.record(0.9, 1.0);
        cm.record(0.5, 0.0);
        cm.record(0.49, 1.0);
        cm.record(0.1, 0.0);
        assert_eq!(cm, matrix(1, 1, 1, 1));
        assert_eq!(cm.total(), 4);
    }

    #[test]
    fn ratios_match_definitions() {
        let cm = matrix(6, 10, 2, 4);
        assert!((cm.precision() - 0.75).abs() < 1e-12);
        assert!((cm.recall() - 0.6).abs() < 1e-12);
        assert!((cm.f1() - 2.0 * 0.75 * 0.6 / 1.35).abs() < 1e-12);
        assert!((cm.accuracy() - 16.0 / 22.0).abs() < 1e-12);
        assert!((cm.false_positive_rate() - 2.0 / 12.0).abs() < 1e-12);
        assert!((cm.false_negative_rate() - 0.4).abs() < 1e-12);
        assert!((cm.negative_accuracy() - 10.0 / 14.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_denominators_report_zero() {
        // Nothing predicted positive and no positives present.
        let cm = matrix(0, 5, 0, 0);
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.recall(), 0.0);
        assert_eq!(cm.f1(), 0.0);
        assert_eq!(cm.false_negative_rate(), 0.0);
        assert_eq!(cm.accuracy(), 1.0);

        // Everything wrong: precision = recall = 0.
        let cm = matrix(0, 0, 3, 3);
        assert_eq!(cm.f1(), 0.0);
        assert_eq!(ConfusionMatrix::default().accuracy(), 0.0);
    }

    #[test]
    fn accumulator_counts_every_window() {
        let mut acc = MetricAccumulator::default();
        acc.record_batch(0.5, &[0.9, 0.1, 0.7], &[1.0, 0.0, 0.0]);
        acc.record_batch(0.3, &[0.2, 0.8], &[1.0, 1.0]);
        let m = acc.finish();
        assert_eq!(m.confusion.total(), 5);
        assert!((m.loss - 0.4).abs() < 1e-6);
        assert_eq!(m.confusion.predicted_positive(), 3);
        assert_eq!(m.confusion.actual_positive(), 3);
        assert!(m.report_values().iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
