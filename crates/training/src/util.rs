use burn::backend::Autodiff;
use burn::tensor::backend::AutodiffBackend;
use clap::Parser;
use cli_support::ArtifactArgs;
use data_contracts::FeatureSchema;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::dataset::PreparedSplits;
use crate::eval::{Evaluator, TestReport};
use crate::trainer::{train, TrainOutcome};
use crate::CpuBackend;

#[derive(Parser, Debug, Default)]
#[command(
    name = "train",
    about = "Train the VSS stall forecaster and evaluate its best checkpoint"
)]
pub struct TrainArgs {
    /// TOML run configuration; flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Training CSV.
    #[arg(long)]
    pub dataset: Option<PathBuf>,
    /// Held-out CSV, split into development and test halves.
    #[arg(long)]
    pub test_dataset: Option<PathBuf>,
    /// Force the CPU backend even when the accelerator is compiled in.
    #[arg(long, default_value_t = false)]
    pub cpu: bool,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub batch_size: Option<usize>,
    #[arg(long)]
    pub epochs: Option<usize>,
    /// Initial learning rate (decays by 0.99 per epoch).
    #[arg(long)]
    pub lr: Option<f64>,
    /// Raw window length in samples.
    #[arg(long)]
    pub data_seg: Option<usize>,
    /// Label horizon in seconds (recorded only).
    #[arg(long)]
    pub lab_seg: Option<usize>,
    /// Keep every n-th step of each window.
    #[arg(long)]
    pub sample_rate: Option<usize>,
    #[arg(long)]
    pub dropout: Option<f64>,
    #[command(flatten)]
    pub artifacts: ArtifactArgs,
}

impl TrainArgs {
    /// Config file (or defaults) with command-line overrides applied, validated.
    pub fn resolve(&self) -> anyhow::Result<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::from_path(path)?,
            None => RunConfig::default(),
        };
        if let Some(v) = &self.dataset {
            cfg.dataset = v.clone();
        }
        if let Some(v) = &self.test_dataset {
            cfg.test_dataset = v.clone();
        }
        if self.cpu {
            cfg.use_accelerator = false;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if let Some(v) = self.batch_size {
            cfg.batch_size = v;
        }
        if let Some(v) = self.epochs {
            cfg.epochs = v;
        }
        if let Some(v) = self.lr {
            cfg.learning_rate = v;
        }
        if let Some(v) = self.data_seg {
            cfg.data_seg = v;
        }
        if let Some(v) = self.lab_seg {
            cfg.lab_seg = v;
        }
        if let Some(v) = self.sample_rate {
            cfg.sample_rate = v;
        }
        if let Some(v) = self.dropout {
            cfg.dropout = v;
        }
        let (dir, run_name) = self.artifacts.resolve(&cfg.artifact_dir, &cfg.run_name);
        cfg.artifact_dir = dir;
        cfg.run_name = run_name;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Cpu,
    Accelerator,
}

/// Pick the backend once at startup. Asking for the accelerator in a build
/// without `backend-wgpu` falls back to the CPU with a warning.
pub fn select_backend(use_accelerator: bool) -> BackendChoice {
    if !use_accelerator {
        return BackendChoice::Cpu;
    }
    if cfg!(feature = "backend-wgpu") {
        BackendChoice::Accelerator
    } else {
        warn!("accelerator requested but this build lacks `backend-wgpu`; using ndarray CPU backend");
        BackendChoice::Cpu
    }
}

pub struct PipelineOutcome {
    pub training: TrainOutcome,
    pub report: TestReport,
}

/// Train, then reload the best checkpoint from disk and score the test split.
pub fn run_pipeline<B: AutodiffBackend>(
    cfg: &RunConfig,
    splits: &PreparedSplits,
    device: &B::Device,
) -> anyhow::Result<PipelineOutcome> {
    B::seed(cfg.seed);
    let training = train::<B>(cfg, splits, device)?;

    let paths = cfg.artifacts();
    let evaluator = Evaluator::<B::InnerBackend>::load(&paths, device)?;
    let report = evaluator.evaluate_normalized(&splits.test, cfg.batch_size)?;
    report.write_predictions(&paths.predictions())?;
    info!(
        path = %paths.predictions().display(),
        rows = report.predictions.len(),
        "wrote test predictions"
    );
    Ok(PipelineOutcome { training, report })
}

pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let cfg = args.resolve()?;
    let schema = FeatureSchema::vss();
    schema.validate()?;
    info!(
        dataset = %cfg.dataset.display(),
        test_dataset = %cfg.test_dataset.display(),
        window_len = cfg.window_len(),
        epochs = cfg.epochs,
        batch_size = cfg.batch_size,
        "starting run {}",
        cfg.run_name
    );
    let splits = PreparedSplits::load(&cfg, &schema)?;

    let outcome = match select_backend(cfg.use_accelerator) {
        #[cfg(feature = "backend-wgpu")]
        BackendChoice::Accelerator => {
            let device = <crate::TrainBackend as burn::tensor::backend::Backend>::Device::default();
            run_pipeline::<Autodiff<crate::TrainBackend>>(&cfg, &splits, &device)?
        }
        _ => {
            let device = <CpuBackend as burn::tensor::backend::Backend>::Device::default();
            run_pipeline::<Autodiff<CpuBackend>>(&cfg, &splits, &device)?
        }
    };

    println!("{}", outcome.report.render());
    Ok(())
}
