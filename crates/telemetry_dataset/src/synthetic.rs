//! Deterministic synthetic telemetry for smoke runs and tests.
//!
//! Positive windows degrade towards their end: RTT and loss climb, RSRP/SNR
//! drop and a handover fires. Negatives stay around their baseline.

use crate::types::{DatasetResult, WindowSet};
use data_contracts::{FeatureSchema, WindowShape};
use rand::{seq::SliceRandom, Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub windows: usize,
    pub steps: usize,
    /// Share of positive windows, in `[0, 1]`.
    pub positive_ratio: f32,
    /// Probability that any single value is replaced by NaN.
    pub missing_prob: f32,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            windows: 200,
            steps: 30,
            positive_ratio: 0.5,
            missing_prob: 0.0,
            seed: 2024,
        }
    }
}

/// Baseline value and noise amplitude per channel of [`FeatureSchema::vss`].
const BASELINE: [(f32, f32); 11] = [
    (40.0, 8.0),    // rtt
    (0.01, 0.005),  // loss_rate
    (0.98, 0.01),   // dns_rate
    (25.0, 5.0),    // dns_latency
    (5.0, 1.0),     // ul_bw
    (30.0, 6.0),    // dl_bw
    (-90.0, 4.0),   // rsrp
    (12.0, 3.0),    // snr
    (1.0, 0.0),     // rat
    (0.0, 0.0),     // handover
    (20.0, 5.0),    // dwell_time
];

/// Generate windows laid out for the default VSS schema.
pub fn generate(cfg: &SyntheticConfig) -> DatasetResult<WindowSet> {
    let channels = FeatureSchema::vss().width();
    let shape = WindowShape::new(cfg.steps, channels);
    let mut rng = rand::rngs::StdRng::seed_from_u64(cfg.seed);
    let positives = (cfg.windows as f32 * cfg.positive_ratio.clamp(0.0, 1.0)).round() as usize;

    let mut features = Vec::with_capacity(cfg.windows * shape.len());
    let mut labels = Vec::with_capacity(cfg.windows);
    for w in 0..cfg.windows {
        let positive = w < positives;
        let onset = cfg.steps * 2 / 3;
        for step in 0..cfg.steps {
            let ramp = if positive && step >= onset {
                (step - onset + 1) as f32 / (cfg.steps - onset).max(1) as f32
            } else {
                0.0
            };
            for (c, (base, noise)) in BASELINE.iter().enumerate() {
                let jitter = if *noise > 0.0 {
                    rng.random_range(-*noise..*noise)
                } else {
                    0.0
                };
                let value = base + jitter + degradation(c, ramp, *base);
                if cfg.missing_prob > 0.0 && rng.random::<f32>() < cfg.missing_prob {
                    features.push(f32::NAN);
                } else {
                    features.push(value);
                }
            }
        }
        labels.push(if positive { 1.0 } else { 0.0 });
    }

    let set = WindowSet::new(shape, features, labels)?;
    // Interleave classes so that contiguous slices stay balanced.
    let mut order: Vec<usize> = (0..cfg.windows).collect();
    order.shuffle(&mut rng);
    Ok(set.select(&order))
}

fn degradation(channel: usize, ramp: f32, base: f32) -> f32 {
    if ramp == 0.0 {
        return 0.0;
    }
    match channel {
        0 => 250.0 * ramp,
        1 => 0.2 * ramp,
        3 => 80.0 * ramp,
        5 => -base * 0.8 * ramp,
        6 => -25.0 * ramp,
        7 => -10.0 * ramp,
        9 => ramp.round(),
        10 => -base * ramp,
        _ => 0.0,
    }
}
