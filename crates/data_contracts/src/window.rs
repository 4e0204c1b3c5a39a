use serde::{Deserialize, Serialize};

use crate::schema::ContractError;

/// Shape of a single telemetry window: `steps` timesteps of `channels` features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowShape {
    pub steps: usize,
    pub channels: usize,
}

impl WindowShape {
    pub fn new(steps: usize, channels: usize) -> Self {
        Self { steps, channels }
    }

    pub fn len(&self) -> usize {
        self.steps * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn check(&self, steps: usize, channels: usize) -> Result<(), ContractError> {
        if steps != self.steps || channels != self.channels {
            return Err(ContractError::WindowShape {
                expected: (self.steps, self.channels),
                found: (steps, channels),
            });
        }
        Ok(())
    }
}

/// Labels are probabilities of a VSS event; positives are `>= 0.5`.
pub fn validate_label(value: f32) -> Result<f32, ContractError> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(ContractError::InvalidLabel(value));
    }
    Ok(value)
}

pub fn is_positive(value: f32) -> bool {
    value >= 0.5
}
