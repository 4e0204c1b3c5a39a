use burn::tensor::{Tensor, TensorData};
use burn_ndarray::NdArray;
use data_contracts::{FeatureFamily, FeatureSchema};
use telemetry_dataset::NormStats;
use training::{
    load_checkpoint, ArtifactPaths, CheckpointMeta, ConfusionMatrix, Evaluator, ModelSelector,
    SplitMetrics, VssModel, VssModelConfig,
};

type B = NdArray<f32>;

fn meta(run_name: &str) -> CheckpointMeta {
    CheckpointMeta {
        run_name: run_name.into(),
        best: None,
        model: VssModelConfig::default(),
        schema: FeatureSchema::vss(),
        data_seg: 4,
        sample_rate: 1,
        window_len: 4,
        lab_seg: 5,
        norm: NormStats {
            mean: vec![0.0; 11],
            std: vec![1.0; 11],
        },
    }
}

fn dev(f1: f64) -> SplitMetrics {
    SplitMetrics {
        f1,
        accuracy: f1,
        ..SplitMetrics::from_confusion(0.1, ConfusionMatrix::default())
    }
}

fn probe(model: &VssModel<B>) -> Vec<f32> {
    let device = Default::default();
    let input = Tensor::<B, 3>::from_data(
        TensorData::new((0..2 * 4 * 11).map(|i| (i as f32 * 0.37).sin()).collect(), [2, 4, 11]),
        &device,
    );
    model.forward(input).into_data().to_vec::<f32>().unwrap()
}

#[test]
fn selector_never_regresses_and_ties_pick_later_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path(), "sel");
    let device = Default::default();
    let cfg = VssModelConfig::default();
    let first = VssModel::<B>::new(&cfg, &device);
    let worse = VssModel::<B>::new(&cfg, &device);
    let tied = VssModel::<B>::new(&cfg, &device);

    let mut selector = ModelSelector::new(paths.clone(), meta("sel"));
    assert!(selector.best().is_none());
    assert!(selector.consider(0, &dev(0.3), &worse).unwrap());
    assert!(!selector.consider(1, &dev(0.2), &first).unwrap());
    assert!(selector.consider(2, &dev(0.6), &first).unwrap());
    assert!(!selector.consider(3, &dev(0.4), &worse).unwrap());
    assert!(selector.consider(4, &dev(0.6), &tied).unwrap());

    let best = selector.best().unwrap();
    assert_eq!(best.epoch, 4);
    assert_eq!(best.f1, 0.6);

    let (loaded, stored) = load_checkpoint::<B>(&paths, &device).unwrap();
    assert_eq!(stored.best, Some(best));
    let (a, b) = (probe(&loaded), probe(&tied));
    assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-6));
}

#[test]
fn first_epoch_with_zero_f1_still_saves() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path(), "zero");
    let model = VssModel::<B>::new(&VssModelConfig::default(), &Default::default());
    let mut selector = ModelSelector::new(paths.clone(), meta("zero"));
    assert!(selector.consider(0, &dev(0.0), &model).unwrap());
    assert!(paths.checkpoint().exists());
    assert!(paths.meta().exists());
}

#[test]
fn missing_checkpoint_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path(), "absent");
    let err = match load_checkpoint::<B>(&paths, &Default::default()) {
        Ok(_) => panic!("loading a missing checkpoint must fail"),
        Err(e) => e.to_string(),
    };
    assert!(err.contains("not found"), "{err}");
}

#[test]
fn evaluator_rejects_schema_that_disagrees_with_towers() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path(), "skewed");
    let model = VssModel::<B>::new(&VssModelConfig::default(), &Default::default());
    let skewed = FeatureSchema {
        families: vec![
            FeatureFamily::new("network", &["a", "b", "c", "d", "e", "f"]),
            FeatureFamily::new("rest", &["g", "h", "i", "j", "k"]),
        ],
    };
    let mut selector = ModelSelector::new(
        paths.clone(),
        CheckpointMeta {
            schema: skewed,
            ..meta("skewed")
        },
    );
    selector.consider(0, &dev(0.5), &model).unwrap();

    let err = match Evaluator::<B>::load(&paths, &Default::default()) {
        Ok(_) => panic!("mismatched schema must be rejected"),
        Err(e) => e.to_string(),
    };
    assert!(err.contains("schema has families"), "{err}");
}
