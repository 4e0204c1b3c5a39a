use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ContractError {
    #[error("feature schema has no families")]
    EmptySchema,
    #[error("feature family `{0}` has no channels")]
    EmptyFamily(String),
    #[error("duplicate feature family `{0}`")]
    DuplicateFamily(String),
    #[error("duplicate channel `{0}`")]
    DuplicateChannel(String),
    #[error("window shape {found:?} does not match expected {expected:?} (steps, channels)")]
    WindowShape {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("label out of range: {0:?}")]
    InvalidLabel(f32),
}

/// One group of telemetry channels routed to its own tower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFamily {
    pub name: String,
    pub channels: Vec<String>,
}

impl FeatureFamily {
    pub fn new(name: &str, channels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.channels.len()
    }
}

/// Ordered feature families. Channel order inside a timestep is the
/// concatenation of the families' channels in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub families: Vec<FeatureFamily>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::vss()
    }
}

impl FeatureSchema {
    /// Network path, radio link and base-station families used by the VSS forecaster.
    pub fn vss() -> Self {
        Self {
            families: vec![
                FeatureFamily::new(
                    "network",
                    &["rtt", "loss_rate", "dns_rate", "dns_latency", "ul_bw", "dl_bw"],
                ),
                FeatureFamily::new("radio", &["rsrp", "snr", "rat"]),
                FeatureFamily::new("base_station", &["handover", "dwell_time"]),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        if self.families.is_empty() {
            return Err(ContractError::EmptySchema);
        }
        let mut names = HashSet::new();
        let mut channels = HashSet::new();
        for family in &self.families {
            if family.channels.is_empty() {
                return Err(ContractError::EmptyFamily(family.name.clone()));
            }
            if !names.insert(family.name.as_str()) {
                return Err(ContractError::DuplicateFamily(family.name.clone()));
            }
            for channel in &family.channels {
                if !channels.insert(channel.as_str()) {
                    return Err(ContractError::DuplicateChannel(channel.clone()));
                }
            }
        }
        Ok(())
    }

    /// Total per-timestep feature width.
    pub fn width(&self) -> usize {
        self.families.iter().map(FeatureFamily::width).sum()
    }

    pub fn family_widths(&self) -> Vec<usize> {
        self.families.iter().map(FeatureFamily::width).collect()
    }

    /// Contiguous channel range of each family, derived from the cumulative widths.
    pub fn family_ranges(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.families
            .iter()
            .map(|family| {
                let range = start..start + family.width();
                start = range.end;
                range
            })
            .collect()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.families
            .iter()
            .flat_map(|f| f.channels.iter().map(String::as_str))
            .collect()
    }
}
