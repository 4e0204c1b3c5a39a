use clap::Parser;
use std::fs;
use std::path::PathBuf;
use telemetry_dataset::{generate, write_windows, SyntheticConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "datagen",
    about = "Write synthetic labelled telemetry windows as train/test CSVs"
)]
struct Args {
    /// Directory receiving train.csv and test.csv.
    #[arg(long, default_value = "data")]
    out_dir: PathBuf,
    #[arg(long, default_value_t = 2000)]
    train_windows: usize,
    /// Size of the held-out pool (later split into dev and test).
    #[arg(long, default_value_t = 1000)]
    test_windows: usize,
    /// Samples per window.
    #[arg(long, default_value_t = 30)]
    steps: usize,
    #[arg(long, default_value_t = 0.5)]
    positive_ratio: f32,
    /// Probability of replacing a value with NaN.
    #[arg(long, default_value_t = 0.0)]
    missing_prob: f32,
    #[arg(long, default_value_t = 2024)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();
    fs::create_dir_all(&args.out_dir)?;

    let base = SyntheticConfig {
        windows: args.train_windows,
        steps: args.steps,
        positive_ratio: args.positive_ratio,
        missing_prob: args.missing_prob,
        seed: args.seed,
    };
    let pool = SyntheticConfig {
        windows: args.test_windows,
        seed: args.seed.wrapping_add(1),
        ..base.clone()
    };

    for (name, cfg) in [("train.csv", base), ("test.csv", pool)] {
        let set = generate(&cfg)?;
        let path = args.out_dir.join(name);
        write_windows(&path, &set)?;
        info!(
            windows = set.len(),
            positives = set.positives(),
            path = %path.display(),
            "wrote synthetic split"
        );
    }
    Ok(())
}
