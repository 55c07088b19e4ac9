use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::Context as _;

use crate::foundation::core::FilterParameter;
use crate::foundation::error::{FilterError, FilterResult};
use crate::session::display::{DisplayEvent, DisplayHandle, PreviewFrame};
use crate::session::lane::BackendLane;

/// What became of one submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// Result handed to the display from `slot`.
    Published { slot: usize },
    /// A newer submission existed when this one got the lock; the backend was not called.
    Superseded,
    /// The backend call failed; the failure was displayed.
    Failed,
}

/// Counters across all submissions since the scheduler was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreviewStats {
    /// Submissions accepted by [`PreviewScheduler::submit`].
    pub submitted: u64,
    /// Executions whose result reached the display.
    pub published: u64,
    /// Submissions skipped because a newer one existed at lock time.
    pub superseded: u64,
    /// Executions whose backend call failed.
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    superseded: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: PreviewOutcome) {
        let counter = match outcome {
            PreviewOutcome::Published { .. } => &self.published,
            PreviewOutcome::Superseded => &self.superseded,
            PreviewOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Identity of one submission. It stays current until a later submission is made.
#[derive(Clone, Debug)]
pub struct PreviewTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl PreviewTicket {
    /// Submission sequence number, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether no later submission has been made.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::Acquire) == self.generation
    }
}

/// Latest-wins preview execution.
///
/// Each submission runs on its own thread and contends for the lane's lock. A submission that
/// is no longer the newest when it gets the lock skips the backend call. One that is still the
/// newest at that point runs to completion and is always displayed, so under continuous input a
/// result appears roughly once per execution. Nothing older than a displayed result reaches the
/// display, and failures are always reported.
pub struct PreviewScheduler {
    latest: Arc<AtomicU64>,
    submitted: AtomicU64,
    counters: Arc<Counters>,
    display: DisplayHandle,
    inflight: Mutex<Vec<JoinHandle<PreviewOutcome>>>,
}

impl PreviewScheduler {
    /// Scheduler that publishes to `display`.
    pub fn new(display: DisplayHandle) -> Self {
        Self {
            latest: Arc::new(AtomicU64::new(0)),
            submitted: AtomicU64::new(0),
            counters: Arc::new(Counters::default()),
            display,
            inflight: Mutex::new(Vec::new()),
        }
    }

    /// Submit a preview on `lane`, superseding every earlier submission.
    pub fn submit(
        &self,
        lane: Arc<BackendLane>,
        param: FilterParameter,
    ) -> FilterResult<PreviewTicket> {
        let generation = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let ticket = PreviewTicket {
            generation,
            latest: Arc::clone(&self.latest),
        };
        tracing::trace!(
            generation,
            backend = lane.name(),
            control = param.control.get(),
            "preview submitted"
        );

        let job = ticket.clone();
        let counters = Arc::clone(&self.counters);
        let display = self.display.clone();
        let handle = std::thread::Builder::new()
            .name(format!("filterbench-preview-{generation}"))
            .spawn(move || {
                let outcome = execute(&lane, param, &job, &display);
                counters.record(outcome);
                outcome
            })
            .context("spawn preview thread")?;

        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        inflight.retain(|h| !h.is_finished());
        inflight.push(handle);
        Ok(ticket)
    }

    /// Generation of the newest submission; 0 before the first.
    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Snapshot of the outcome counters.
    pub fn stats(&self) -> PreviewStats {
        PreviewStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            published: self.counters.published.load(Ordering::Relaxed),
            superseded: self.counters.superseded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Block until every outstanding submission has finished. Returns the outcomes of those
    /// that were still tracked, in submission order.
    pub fn wait_idle(&self) -> Vec<PreviewOutcome> {
        let handles =
            std::mem::take(&mut *self.inflight.lock().unwrap_or_else(PoisonError::into_inner));
        handles
            .into_iter()
            .filter_map(|h| match h.join() {
                Ok(outcome) => Some(outcome),
                Err(_) => {
                    tracing::error!("preview thread panicked");
                    None
                }
            })
            .collect()
    }
}

fn execute(
    lane: &BackendLane,
    param: FilterParameter,
    ticket: &PreviewTicket,
    display: &DisplayHandle,
) -> PreviewOutcome {
    let generation = ticket.generation();
    let fail = |error: FilterError| {
        tracing::warn!(generation, backend = lane.name(), error = %error, "preview failed");
        display.publish(DisplayEvent::PreviewFailed {
            generation,
            backend: lane.name(),
            control: param.control,
            error,
        });
        PreviewOutcome::Failed
    };

    let mut state = match lane.lock() {
        Ok(state) => state,
        Err(e) => return fail(e),
    };
    if !ticket.is_current() {
        tracing::trace!(generation, "preview superseded before execution");
        return PreviewOutcome::Superseded;
    }

    let slot = state.next_slot();
    let started = Instant::now();
    let image = match state.backend_mut().apply(param, slot) {
        Ok(image) => image,
        Err(e) => return fail(e),
    };
    let latency = started.elapsed();

    display.publish(DisplayEvent::Frame(PreviewFrame {
        generation,
        backend: lane.name(),
        filter: param.kind,
        control: param.control,
        slot,
        latency,
        image,
    }));
    state.advance_slot();
    tracing::debug!(
        generation,
        backend = lane.name(),
        slot,
        latency_ms = latency.as_secs_f64() * 1000.0,
        "preview published"
    );
    PreviewOutcome::Published { slot }
}

#[cfg(test)]
#[path = "../../tests/unit/session/preview.rs"]
mod tests;
