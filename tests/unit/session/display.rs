use super::*;

fn frame(generation: u64, control: u32) -> PreviewFrame {
    PreviewFrame {
        generation,
        backend: "reference",
        filter: FilterKind::Blur,
        control: ControlValue::new(control).unwrap(),
        slot: 0,
        latency: Duration::from_millis(1),
        image: Arc::new(PixelBuffer::from_rgba8(1, 1, vec![0, 0, 0, 255]).unwrap()),
    }
}

#[test]
fn drain_presents_in_publish_order() {
    let (handle, queue) = display_channel();
    handle.publish(DisplayEvent::Frame(frame(1, 10)));
    handle.publish(DisplayEvent::PreviewFailed {
        generation: 2,
        backend: "reference",
        control: ControlValue::MAX,
        error: FilterError::NotConfigured,
    });
    handle.clone().publish(DisplayEvent::Frame(frame(3, 90)));

    let mut sink = InMemorySink::new();
    assert_eq!(queue.drain(&mut sink), 3);
    assert_eq!(queue.drain(&mut sink), 0);

    let generations: Vec<u64> = sink.frames().map(|f| f.generation).collect();
    assert_eq!(generations, vec![1, 3]);
    assert_eq!(sink.preview_failures(), 1);
    assert_eq!(sink.last_frame().unwrap().control.get(), 90);
}

#[test]
fn publish_after_queue_dropped_is_silent() {
    let (handle, queue) = display_channel();
    drop(queue);
    handle.publish(DisplayEvent::Frame(frame(1, 0)));
}

#[test]
fn next_timeout_returns_none_when_idle() {
    let (_handle, queue) = display_channel();
    assert!(queue.next_timeout(Duration::from_millis(5)).is_none());
}
