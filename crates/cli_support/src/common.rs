use clap::Args;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install a fmt subscriber driven by `RUST_LOG`, falling back to `info`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Where a run's checkpoint and sidecars live, shared by train and eval.
#[derive(Debug, Clone, Default, Args)]
pub struct ArtifactArgs {
    /// Directory holding `<run-name>.bin` and its sidecars.
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,
    /// Run name; keys every artifact file.
    #[arg(long)]
    pub run_name: Option<String>,
}

impl ArtifactArgs {
    /// Resolve against fallbacks taken from the run configuration.
    pub fn resolve(&self, dir: &std::path::Path, run_name: &str) -> (PathBuf, String) {
        (
            self.artifact_dir.clone().unwrap_or_else(|| dir.to_path_buf()),
            self.run_name.clone().unwrap_or_else(|| run_name.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::Path;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    }

    #[test]
    fn flags_override_fallbacks() {
        let cli = Cli::parse_from(["bin", "--artifact-dir", "out", "--run-name", "r1"]);
        let (dir, name) = cli.artifacts.resolve(Path::new("models"), "vss");
        assert_eq!(dir, PathBuf::from("out"));
        assert_eq!(name, "r1");
    }

    #[test]
    fn missing_flags_use_fallbacks() {
        let (dir, name) = ArtifactArgs::default().resolve(Path::new("models"), "vss");
        assert_eq!(dir, PathBuf::from("models"));
        assert_eq!(name, "vss");
    }
}
