//! Dataset loading, splitting, normalization and burn batching for VSS telemetry.
//!
//! This crate provides utilities for:
//! - Loading labelled telemetry windows from CSV
//! - Seeded development/test splitting of a held-out pool
//! - Per-channel normalization fitted on the training split
//! - Burn-compatible batch iteration
//! - Synthetic windows for smoke runs

pub mod batch;
pub mod loader;
pub mod normalize;
pub mod parse;
pub mod splits;
pub mod synthetic;
pub mod types;

pub use batch::{BatchIter, WindowBatch};
pub use loader::{load_windows, write_windows, WindowSpec};
pub use normalize::{NormStats, STD_EPSILON};
pub use splits::{dev_len, split_dev_test, DEV_FRACTION};
pub use synthetic::{generate, SyntheticConfig};
pub use types::*;
