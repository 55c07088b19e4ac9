use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use crate::foundation::core::{ControlValue, FilterKind, PixelBuffer};
use crate::foundation::error::FilterError;
use crate::session::benchmark::BenchmarkResult;

/// A preview result cleared for display.
#[derive(Clone, Debug)]
pub struct PreviewFrame {
    /// Submission generation that produced this frame.
    pub generation: u64,
    /// Backend that produced the frame.
    pub backend: &'static str,
    /// Filter that was applied.
    pub filter: FilterKind,
    /// Control value the frame was rendered for.
    pub control: ControlValue,
    /// Output slot the frame was written into.
    pub slot: usize,
    /// Wall time spent inside the backend call.
    pub latency: Duration,
    /// The filtered image, shared with its output slot.
    pub image: Arc<PixelBuffer>,
}

/// Everything the core hands to the display collaborator.
#[derive(Debug)]
pub enum DisplayEvent {
    /// Newest preview result.
    Frame(PreviewFrame),
    /// A preview execution failed; carries the failure, never a stale image.
    PreviewFailed {
        generation: u64,
        backend: &'static str,
        control: ControlValue,
        error: FilterError,
    },
    /// A benchmark took the lane; interactive controls should be disabled.
    BenchmarkStarted {
        backend: &'static str,
        filter: FilterKind,
        control: ControlValue,
    },
    /// Benchmark completed; controls may be re-enabled.
    BenchmarkFinished(BenchmarkResult),
    /// Benchmark aborted; controls may be re-enabled.
    BenchmarkFailed {
        backend: &'static str,
        error: FilterError,
    },
}

/// Consumer of display events, driven on the collaborator's own thread.
pub trait DisplaySink {
    fn present(&mut self, event: DisplayEvent);
}

/// Collects events in memory. Useful for tests and headless runs.
#[derive(Debug, Default)]
pub struct InMemorySink {
    /// Every presented event, in arrival order.
    pub events: Vec<DisplayEvent>,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames in arrival order.
    pub fn frames(&self) -> impl Iterator<Item = &PreviewFrame> {
        self.events.iter().filter_map(|e| match e {
            DisplayEvent::Frame(frame) => Some(frame),
            _ => None,
        })
    }

    /// Most recently presented frame.
    pub fn last_frame(&self) -> Option<&PreviewFrame> {
        self.frames().last()
    }

    /// Number of preview failures presented.
    pub fn preview_failures(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, DisplayEvent::PreviewFailed { .. }))
            .count()
    }

    /// Completed benchmark results in arrival order.
    pub fn benchmark_results(&self) -> impl Iterator<Item = &BenchmarkResult> {
        self.events.iter().filter_map(|e| match e {
            DisplayEvent::BenchmarkFinished(result) => Some(result),
            _ => None,
        })
    }
}

impl DisplaySink for InMemorySink {
    fn present(&mut self, event: DisplayEvent) {
        self.events.push(event);
    }
}

/// Producer side of the display hand-off. Cheap to clone; safe to use from any thread.
#[derive(Clone, Debug)]
pub struct DisplayHandle {
    tx: Sender<DisplayEvent>,
}

impl DisplayHandle {
    /// Queue an event for the collaborator. Dropped silently once the collaborator is gone.
    pub fn publish(&self, event: DisplayEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("display receiver dropped; event discarded");
        }
    }
}

/// Consumer side of the display hand-off, owned by the collaborator's thread.
#[derive(Debug)]
pub struct DisplayQueue {
    rx: Receiver<DisplayEvent>,
}

impl DisplayQueue {
    /// Present every queued event without blocking. Returns how many were presented.
    pub fn drain(&self, sink: &mut dyn DisplaySink) -> usize {
        let mut n = 0usize;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    sink.present(event);
                    n += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return n,
            }
        }
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<DisplayEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Create a connected producer/consumer pair.
pub fn display_channel() -> (DisplayHandle, DisplayQueue) {
    let (tx, rx) = mpsc::channel();
    (DisplayHandle { tx }, DisplayQueue { rx })
}

#[cfg(test)]
#[path = "../../tests/unit/session/display.rs"]
mod tests;
