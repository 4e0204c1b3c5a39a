use std::path::PathBuf;
use training::RunConfig;

#[test]
fn partial_toml_keeps_defaults() {
    let cfg = RunConfig::from_toml_str(
        r#"
        dataset = "runs/train.csv"
        epochs = 5
        learning_rate = 0.005
        sample_rate = 2
        "#,
    )
    .unwrap();
    assert_eq!(cfg.dataset, PathBuf::from("runs/train.csv"));
    assert_eq!(cfg.epochs, 5);
    assert_eq!(cfg.window_len(), 15);
    assert_eq!(cfg.batch_size, 128);
    assert_eq!(cfg.seed, 2024);
    assert!(cfg.validate().is_ok());
}

#[test]
fn unknown_keys_are_rejected() {
    assert!(RunConfig::from_toml_str("epoch = 3").is_err());
}

#[test]
fn config_file_on_disk_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.toml");
    std::fs::write(&path, "run_name = \"night\"\nuse_accelerator = false\n").unwrap();
    let cfg = RunConfig::from_path(&path).unwrap();
    assert_eq!(cfg.run_name, "night");
    assert!(!cfg.use_accelerator);
    assert_eq!(cfg.artifacts().checkpoint(), PathBuf::from("models/night.bin"));
}

#[test]
fn missing_config_file_names_the_path() {
    let err = RunConfig::from_path(std::path::Path::new("no/such/run.toml"))
        .unwrap_err()
        .to_string();
    assert!(err.contains("no/such/run.toml"), "{err}");
}
