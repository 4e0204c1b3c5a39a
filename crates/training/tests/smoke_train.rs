use burn::backend::Autodiff;
use burn_ndarray::NdArray;
use data_contracts::FeatureSchema;
use telemetry_dataset::{generate, SyntheticConfig};
use training::{run_pipeline, PreparedSplits, RunConfig};

type B = Autodiff<NdArray<f32>>;

fn smoke_config(dir: &std::path::Path) -> RunConfig {
    RunConfig {
        use_accelerator: false,
        epochs: 2,
        batch_size: 16,
        artifact_dir: dir.to_path_buf(),
        run_name: "smoke".into(),
        ..Default::default()
    }
}

fn smoke_splits(seed: u64) -> PreparedSplits {
    let train = generate(&SyntheticConfig {
        windows: 200,
        seed,
        ..Default::default()
    })
    .unwrap();
    let pool = generate(&SyntheticConfig {
        windows: 100,
        seed: seed + 1,
        ..Default::default()
    })
    .unwrap();
    PreparedSplits::from_raw(FeatureSchema::vss(), train, pool, seed).unwrap()
}

#[test]
fn two_epoch_run_leaves_one_checkpoint_and_a_full_report() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = smoke_config(dir.path());
    cfg.validate().unwrap();
    let splits = smoke_splits(cfg.seed);
    assert_eq!(splits.dev.len(), 50);
    assert_eq!(splits.test.len(), 50);

    let device = <B as burn::tensor::backend::Backend>::Device::default();
    let outcome = run_pipeline::<B>(&cfg, &splits, &device).unwrap();

    let bins: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "bin"))
        .collect();
    assert_eq!(bins.len(), 1);
    assert!(cfg.artifacts().meta().exists());

    let values = outcome.report.metrics.report_values();
    assert_eq!(values.len(), 8);
    assert!(values.iter().all(|v| v.is_finite()));
    assert!(values[0] >= 0.0);
    assert!(values[1..].iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(
        outcome.report.metrics.confusion.total() as usize,
        splits.test.len()
    );

    assert_eq!(outcome.training.epochs.len(), 2);
    assert!(outcome.training.epochs[0].checkpointed);
    let best_dev = outcome
        .training
        .epochs
        .iter()
        .map(|e| e.dev.f1)
        .fold(f64::MIN, f64::max);
    assert_eq!(outcome.training.best.f1, best_dev);

    let log = std::fs::read_to_string(cfg.artifacts().metrics_log()).unwrap();
    assert_eq!(log.lines().count(), 2);

    let mut reader = csv::Reader::from_path(cfg.artifacts().predictions()).unwrap();
    assert_eq!(reader.records().count(), splits.test.len());
}

#[test]
fn stored_checkpoint_reproduces_test_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = smoke_config(dir.path());
    let splits = smoke_splits(cfg.seed);
    let device = <B as burn::tensor::backend::Backend>::Device::default();
    let outcome = run_pipeline::<B>(&cfg, &splits, &device).unwrap();

    let evaluator = training::Evaluator::<NdArray<f32>>::load(&cfg.artifacts(), &device).unwrap();
    assert_eq!(evaluator.meta().norm, splits.stats);
    let again = evaluator
        .evaluate_normalized(&splits.test, cfg.batch_size)
        .unwrap();
    assert_eq!(again.metrics.confusion, outcome.report.metrics.confusion);
}
