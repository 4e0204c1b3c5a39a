use clap::Parser;
use cli_support::ArtifactArgs;
use std::path::PathBuf;
use telemetry_dataset::{load_windows, split_dev_test, WindowSpec};
use tracing::info;
use training::{Evaluator, RunConfig, TrainBackend};

#[derive(Parser, Debug)]
#[command(
    name = "eval",
    about = "Evaluate a stored VSS checkpoint on a labelled telemetry CSV"
)]
struct Args {
    #[command(flatten)]
    artifacts: ArtifactArgs,
    /// Labelled windows to score (raw, un-normalized).
    #[arg(long, default_value = "data/test.csv")]
    test_dataset: PathBuf,
    #[arg(long, default_value_t = 128)]
    batch_size: usize,
    /// Treat the CSV as a held-out pool and score only the test half drawn with this seed.
    #[arg(long)]
    pool_seed: Option<u64>,
    /// Where to write per-window predictions (defaults to the run's predictions file).
    #[arg(long)]
    predictions_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();
    if args.batch_size == 0 {
        anyhow::bail!("--batch-size must be positive");
    }

    let defaults = RunConfig::default();
    let (dir, run_name) = args
        .artifacts
        .resolve(&defaults.artifact_dir, &defaults.run_name);
    let paths = training::ArtifactPaths::new(&dir, &run_name);

    let device = <TrainBackend as burn::tensor::backend::Backend>::Device::default();
    let evaluator = Evaluator::<TrainBackend>::load(&paths, &device)?;
    let meta = evaluator.meta();
    if let Some(best) = meta.best {
        info!(
            epoch = best.epoch,
            dev_f1 = best.f1,
            "loaded checkpoint {}",
            paths.checkpoint().display()
        );
    }

    let spec = WindowSpec::new(meta.data_seg, meta.sample_rate);
    let windows = load_windows(&args.test_dataset, &meta.schema, spec).map_err(|e| {
        anyhow::anyhow!("failed to load {}: {e}", args.test_dataset.display())
    })?;
    let windows = match args.pool_seed {
        Some(seed) => split_dev_test(&windows, seed).1,
        None => windows,
    };
    if windows.is_empty() {
        anyhow::bail!("no windows to evaluate in {}", args.test_dataset.display());
    }

    let report = evaluator.evaluate_raw(&windows, args.batch_size)?;
    let out = args.predictions_out.unwrap_or_else(|| paths.predictions());
    report.write_predictions(&out)?;
    info!(rows = report.predictions.len(), path = %out.display(), "wrote predictions");
    println!("{}", report.render());
    Ok(())
}
