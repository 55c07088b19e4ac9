use super::*;
use crate::foundation::core::{ControlValue, FilterKind, PixelBuffer};
use crate::render::cpu::ReferenceBackend;

fn input() -> Arc<PixelBuffer> {
    Arc::new(PixelBuffer::from_rgba8(2, 2, vec![7u8; 16]).unwrap())
}

#[test]
fn rotation_index_lives_under_the_lock() {
    let lane = BackendLane::configure(Box::new(ReferenceBackend::new()), input(), 3).unwrap();
    assert_eq!(lane.name(), "reference");

    let mut seen = Vec::new();
    for _ in 0..4 {
        let mut state = lane.lock().unwrap();
        seen.push(state.next_slot());
        state.advance_slot();
    }
    assert_eq!(seen, vec![0, 1, 2, 0]);
}

#[test]
fn shutdown_cleans_up_backend() {
    let lane = BackendLane::configure(Box::new(ReferenceBackend::new()), input(), 2).unwrap();
    lane.shutdown();
    let mut state = lane.lock().unwrap();
    assert!(!state.backend_mut().is_configured());
    let param = FilterKind::Blur.parameter(ControlValue::MIN);
    assert!(matches!(
        state.backend_mut().apply(param, 0),
        Err(FilterError::NotConfigured)
    ));
}

#[test]
fn configure_failure_is_propagated() {
    let err = BackendLane::configure(Box::new(ReferenceBackend::new()), input(), 1);
    assert!(matches!(err, Err(FilterError::Validation(_))));
}
