use super::*;

fn control(v: u32) -> ControlValue {
    ControlValue::new(v).unwrap()
}

#[test]
fn rescale_hits_both_ends() {
    assert_eq!(rescale(ControlValue::MIN, 1.0, 50.0), 1.0);
    assert_eq!(rescale(ControlValue::MAX, 1.0, 50.0), 50.0);
}

#[test]
fn rescale_matches_linear_formula_and_is_monotonic() {
    let mut prev = f64::NEG_INFINITY;
    for p in 0..=100u32 {
        let v = rescale(control(p), 1.0, 50.0);
        let expected = 49.0 * (f64::from(p) / 100.0) + 1.0;
        assert!((v - expected).abs() < 1e-9, "p={p}: {v} vs {expected}");
        assert!(v >= prev);
        prev = v;
    }
}

#[test]
fn blur_parameter_for_midpoint_and_zero() {
    let mid = FilterKind::Blur.parameter(control(50));
    assert!((mid.value - 25.5).abs() < 1e-6);
    assert_eq!(mid.control.get(), 50);

    let low = FilterKind::Blur.parameter(control(0));
    assert_eq!(low.value, 1.0);
}

#[test]
fn control_value_rejects_out_of_range() {
    assert!(ControlValue::new(100).is_ok());
    let err = ControlValue::new(101).unwrap_err();
    assert!(matches!(err, FilterError::Validation(_)));
}

#[test]
fn control_value_deserializes_through_validation() {
    let ok: ControlValue = serde_json::from_str("42").unwrap();
    assert_eq!(ok.get(), 42);
    assert!(serde_json::from_str::<ControlValue>("250").is_err());
}

#[test]
fn pixel_buffer_checks_length() {
    assert!(PixelBuffer::from_rgba8(2, 2, vec![0u8; 16]).is_ok());
    assert!(PixelBuffer::from_rgba8(2, 2, vec![0u8; 15]).is_err());
    assert!(PixelBuffer::from_rgba8(0, 2, Vec::new()).is_err());

    let z = PixelBuffer::zeroed(3, 2, PixelFormat::Rgba8).unwrap();
    assert_eq!(z.data.len(), 24);
    assert_eq!(z.row_bytes(), 12);
    assert!(z.has_shape(3, 2, PixelFormat::Rgba8));
}
