use super::*;

#[test]
fn defaults_match_documented_caps() {
    let opts = WorkbenchOpts::default();
    assert_eq!(opts.slot_count, 2);
    assert_eq!(opts.downsample_factor, 4);
    assert_eq!(opts.warmup.max_iterations, 10);
    assert_eq!(opts.warmup.max_elapsed_ms, 1000);
    assert_eq!(opts.measurement.max_iterations, 1000);
    assert_eq!(opts.measurement.max_elapsed_ms, 5000);
    assert_eq!(opts.initial_control.get(), 50);
    opts.validate().unwrap();
}

#[test]
fn partial_json_keeps_defaults() {
    let opts = WorkbenchOpts::from_json_str(r#"{ "slot_count": 3 }"#).unwrap();
    assert_eq!(opts.slot_count, 3);
    assert_eq!(opts.downsample_factor, 4);
    assert_eq!(opts.measurement, LoopBudget::MEASUREMENT);
}

#[test]
fn rejects_bad_values() {
    assert!(WorkbenchOpts::from_json_str(r#"{ "slot_count": 1 }"#).is_err());
    assert!(WorkbenchOpts::from_json_str(r#"{ "downsample_factor": 0 }"#).is_err());
    assert!(
        WorkbenchOpts::from_json_str(
            r#"{ "warmup": { "max_iterations": 0, "max_elapsed_ms": 10 } }"#
        )
        .is_err()
    );
    assert!(WorkbenchOpts::from_json_str(r#"{ "initial_control": 101 }"#).is_err());
    assert!(WorkbenchOpts::from_json_str(r#"{ "slots": 2 }"#).is_err());
}
