use super::*;
use crate::foundation::core::{ControlValue, FilterKind, PixelBuffer};
use crate::render::cpu::ReferenceBackend;
use crate::session::display::{InMemorySink, display_channel};

fn lane(slot_count: usize) -> Arc<BackendLane> {
    let input = Arc::new(PixelBuffer::from_rgba8(3, 3, vec![200u8; 36]).unwrap());
    Arc::new(BackendLane::configure(Box::new(ReferenceBackend::new()), input, slot_count).unwrap())
}

fn param(control: u32) -> FilterParameter {
    FilterKind::Blur.parameter(ControlValue::new(control).unwrap())
}

#[test]
fn sequential_submissions_rotate_slots() {
    let (display, queue) = display_channel();
    let scheduler = PreviewScheduler::new(display);
    let lane = lane(3);

    let mut outcomes = Vec::new();
    for control in [10, 20, 30, 40] {
        scheduler.submit(Arc::clone(&lane), param(control)).unwrap();
        outcomes.extend(scheduler.wait_idle());
    }
    assert_eq!(
        outcomes,
        vec![
            PreviewOutcome::Published { slot: 0 },
            PreviewOutcome::Published { slot: 1 },
            PreviewOutcome::Published { slot: 2 },
            PreviewOutcome::Published { slot: 0 },
        ]
    );

    let mut sink = InMemorySink::new();
    queue.drain(&mut sink);
    let controls: Vec<u8> = sink.frames().map(|f| f.control.get()).collect();
    assert_eq!(controls, vec![10, 20, 30, 40]);
    assert_eq!(
        scheduler.stats(),
        PreviewStats {
            submitted: 4,
            published: 4,
            superseded: 0,
            failed: 0,
        }
    );
}

#[test]
fn tickets_go_stale_on_next_submit() {
    let (display, _queue) = display_channel();
    let scheduler = PreviewScheduler::new(display);
    let lane = lane(2);
    assert_eq!(scheduler.latest_generation(), 0);

    let first = scheduler.submit(Arc::clone(&lane), param(10)).unwrap();
    assert_eq!(first.generation(), 1);
    let second = scheduler.submit(lane, param(90)).unwrap();
    assert_eq!(second.generation(), 2);
    assert!(!first.is_current());
    assert!(second.is_current());
    assert_eq!(scheduler.latest_generation(), second.generation());
    scheduler.wait_idle();
}

#[test]
fn backend_failure_is_displayed_not_dropped() {
    let (display, queue) = display_channel();
    let scheduler = PreviewScheduler::new(display);
    let lane = lane(2);
    lane.shutdown();

    scheduler.submit(lane, param(50)).unwrap();
    assert_eq!(scheduler.wait_idle(), vec![PreviewOutcome::Failed]);

    let mut sink = InMemorySink::new();
    queue.drain(&mut sink);
    assert_eq!(sink.frames().count(), 0);
    assert!(matches!(
        sink.events.as_slice(),
        [DisplayEvent::PreviewFailed {
            generation: 1,
            error: FilterError::NotConfigured,
            ..
        }]
    ));
    assert_eq!(scheduler.stats().failed, 1);
}

#[test]
fn wait_idle_without_submissions_is_empty() {
    let (display, _queue) = display_channel();
    let scheduler = PreviewScheduler::new(display);
    assert!(scheduler.wait_idle().is_empty());
}
