pub mod common;

pub use common::{init_tracing, ArtifactArgs, DEFAULT_LOG_FILTER};
