use super::*;

#[test]
fn reference_is_always_available() {
    assert!(BackendKind::available().contains(&BackendKind::Reference));
    assert_eq!(
        "Reference".parse::<BackendKind>().unwrap(),
        BackendKind::Reference
    );
    assert!("vulkan".parse::<BackendKind>().is_err());
}

#[test]
fn created_backend_starts_unconfigured() {
    let backend = create_backend(BackendKind::Reference, &BackendSettings::default()).unwrap();
    assert!(!backend.is_configured());
    assert_eq!(backend.name(), "reference");
}

#[cfg(feature = "gpu")]
#[test]
fn gpu_kind_round_trips_name() {
    assert_eq!("gpu".parse::<BackendKind>().unwrap(), BackendKind::Gpu);
    assert_eq!(BackendKind::Gpu.to_string(), "gpu");
}
