use data_contracts::{validate_label, ContractError, FeatureFamily, FeatureSchema, WindowShape};

#[test]
fn duplicate_channel_rejected() {
    let schema = FeatureSchema {
        families: vec![
            FeatureFamily::new("network", &["rtt", "loss_rate"]),
            FeatureFamily::new("radio", &["rtt"]),
        ],
    };
    assert_eq!(
        schema.validate().unwrap_err(),
        ContractError::DuplicateChannel("rtt".into())
    );
}

#[test]
fn empty_family_rejected() {
    let schema = FeatureSchema {
        families: vec![FeatureFamily::new("radio", &[])],
    };
    assert!(matches!(
        schema.validate(),
        Err(ContractError::EmptyFamily(_))
    ));
    assert_eq!(
        FeatureSchema { families: vec![] }.validate().unwrap_err(),
        ContractError::EmptySchema
    );
}

#[test]
fn window_shape_mismatch_reports_both_shapes() {
    let shape = WindowShape::new(30, 11);
    assert!(shape.check(30, 11).is_ok());
    let err = shape.check(30, 10).unwrap_err();
    assert_eq!(
        err,
        ContractError::WindowShape {
            expected: (30, 11),
            found: (30, 10)
        }
    );
}

#[test]
fn labels_must_be_probabilities() {
    assert_eq!(validate_label(1.0), Ok(1.0));
    assert!(validate_label(f32::NAN).is_err());
    assert!(validate_label(2.0).is_err());
}

#[test]
fn schema_roundtrips_through_json() {
    let schema = FeatureSchema::vss();
    let json = serde_json::to_string(&schema).unwrap();
    let back: FeatureSchema = serde_json::from_str(&json).unwrap();
    assert_eq!(back, schema);
}
