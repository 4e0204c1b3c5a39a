//! Shared data contracts for VSS telemetry: feature families, window shapes and labels.

pub mod schema;
pub mod window;

pub use schema::{ContractError, FeatureFamily, FeatureSchema};
pub use window::{is_positive, validate_label, WindowShape};
