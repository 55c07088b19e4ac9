use super::*;

#[test]
fn output_size_divides_and_never_collapses() {
    let b = GpuBackend::new(BackendSettings {
        downsample_factor: 4,
    })
    .unwrap();
    assert_eq!(b.output_size(1024, 768), (256, 192));
    assert_eq!(b.output_size(3, 2), (1, 1));
}

#[test]
fn zero_downsample_factor_is_rejected() {
    assert!(
        GpuBackend::new(BackendSettings {
            downsample_factor: 0
        })
        .is_err()
    );
}

#[test]
fn readback_rows_are_aligned() {
    assert_eq!(align_to(4, 256), 256);
    assert_eq!(align_to(256, 256), 256);
    assert_eq!(align_to(1028, 256), 1280);
}

#[test]
fn blur_params_pack_little_endian_vec4() {
    let p = blur_params(2.0, 6.0, [0.0, 1.0]);
    assert_eq!(&p[0..4], &2.0f32.to_le_bytes());
    assert_eq!(&p[4..8], &6.0f32.to_le_bytes());
    assert_eq!(&p[8..12], &0.0f32.to_le_bytes());
    assert_eq!(&p[12..16], &1.0f32.to_le_bytes());
}

#[test]
fn apply_before_configure_is_not_configured() {
    let mut b = GpuBackend::new(BackendSettings::default()).unwrap();
    let param = FilterKind::Blur.parameter(crate::ControlValue::MIDPOINT);
    assert!(matches!(b.apply(param, 0), Err(FilterError::NotConfigured)));
    b.cleanup();
    assert!(!b.is_configured());
}
