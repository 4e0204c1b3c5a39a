#![recursion_limit = "256"]

pub mod checkpoint;
pub mod clip;
pub mod config;
pub mod dataset;
pub mod eval;
pub mod metrics;
pub mod trainer;
pub mod util;

pub use checkpoint::{load_checkpoint, ArtifactPaths, BestCheckpoint, CheckpointMeta, ModelSelector};
pub use clip::{clip_grad_norm, global_grad_norm};
pub use config::RunConfig;
pub use dataset::PreparedSplits;
pub use eval::{Evaluator, Prediction, TestReport, REPORT_HEADER};
pub use metrics::{ConfusionMatrix, MetricAccumulator, SplitMetrics, DECISION_THRESHOLD};
pub use models::{VssModel, VssModelConfig};
pub use trainer::{binary_cross_entropy, evaluate_split, train, EpochReport, TrainOutcome};
pub use util::{run_pipeline, run_train, select_backend, BackendChoice, PipelineOutcome, TrainArgs};

/// CPU backend, always available.
pub type CpuBackend = burn_ndarray::NdArray<f32>;

/// Backend alias for training/eval (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = CpuBackend;
