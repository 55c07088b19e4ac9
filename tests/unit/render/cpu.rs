use super::*;
use crate::foundation::core::ControlValue;

fn checker(w: u32, h: u32) -> Arc<PixelBuffer> {
    let mut data = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            let v = if (x + y) % 2 == 0 { 255 } else { 0 };
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    Arc::new(PixelBuffer::from_rgba8(w, h, data).unwrap())
}

fn blur(control: u32) -> FilterParameter {
    FilterKind::Blur.parameter(ControlValue::new(control).unwrap())
}

#[test]
fn apply_before_configure_is_not_configured() {
    let mut b = ReferenceBackend::new();
    assert!(matches!(b.apply(blur(10), 0), Err(FilterError::NotConfigured)));
}

#[test]
fn double_configure_fails_fast() {
    let mut b = ReferenceBackend::new();
    b.configure(checker(4, 4), 2).unwrap();
    assert!(matches!(
        b.configure(checker(4, 4), 2),
        Err(FilterError::InvalidState(_))
    ));
}

#[test]
fn cleanup_is_idempotent_and_allows_reconfigure() {
    let mut b = ReferenceBackend::new();
    b.cleanup();
    b.configure(checker(4, 4), 2).unwrap();
    b.cleanup();
    b.cleanup();
    assert!(!b.is_configured());
    b.configure(checker(6, 6), 3).unwrap();
    let out = b.apply(blur(0), 2).unwrap();
    assert_eq!((out.width, out.height), (6, 6));
    assert!(matches!(b.apply(blur(0), 3), Err(FilterError::Validation(_))));
}

#[test]
fn apply_blurs_at_full_resolution() {
    let input = checker(8, 8);
    let mut b = ReferenceBackend::new();
    b.configure(input.clone(), 2).unwrap();

    let out = b.apply(blur(50), 0).unwrap();
    assert_eq!((out.width, out.height), (8, 8));
    assert_ne!(out.data, input.data);
    // A strong blur of a checkerboard converges on mid-grey.
    assert!(out.data.chunks_exact(4).all(|px| (100..=155).contains(&px[0])));
}

#[test]
fn slots_rotate_without_clobbering_held_frames() {
    let mut b = ReferenceBackend::new();
    b.configure(checker(8, 8), 2).unwrap();

    let first = b.apply(blur(0), 0).unwrap();
    let snapshot = first.data.clone();
    let second = b.apply(blur(100), 1).unwrap();
    let third = b.apply(blur(100), 0).unwrap();

    assert_eq!(first.data, snapshot);
    assert_eq!(second.data, third.data);
}
