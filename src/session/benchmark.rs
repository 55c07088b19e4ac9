use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::core::{ControlValue, FilterKind, FilterParameter};
use crate::foundation::error::{FilterError, FilterResult};
use crate::render::backend::FilterBackend;
use crate::session::display::{DisplayEvent, DisplayHandle};
use crate::session::lane::BackendLane;

/// Slot every benchmark iteration writes into.
pub const BENCHMARK_SLOT: usize = 0;

/// Dual cap on a timing loop: it stops at whichever limit is reached first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopBudget {
    /// Stop after this many iterations.
    pub max_iterations: u32,
    /// Stop once the summed iteration time reaches this many milliseconds.
    pub max_elapsed_ms: u64,
}

impl LoopBudget {
    /// Default warmup caps: 10 iterations or 1 s.
    pub const WARMUP: Self = Self {
        max_iterations: 10,
        max_elapsed_ms: 1_000,
    };
    /// Default measurement caps: 1000 iterations or 5 s.
    pub const MEASUREMENT: Self = Self {
        max_iterations: 1_000,
        max_elapsed_ms: 5_000,
    };

    /// Elapsed cap as a [`Duration`].
    pub fn max_elapsed(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_ms)
    }

    /// Reject zero caps; `phase` names the budget in the error.
    pub fn validate(&self, phase: &str) -> FilterResult<()> {
        if self.max_iterations == 0 {
            return Err(FilterError::validation(format!(
                "{phase}.max_iterations must be >= 1"
            )));
        }
        if self.max_elapsed_ms == 0 {
            return Err(FilterError::validation(format!(
                "{phase}.max_elapsed_ms must be >= 1"
            )));
        }
        Ok(())
    }
}

/// Accumulated timings of one loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Iterations completed.
    pub iterations: u32,
    /// Sum of per-iteration durations.
    pub total: Duration,
    /// Slowest single iteration.
    pub max_iteration: Duration,
}

impl LoopStats {
    /// Mean iteration time; zero when nothing ran.
    pub fn average(&self) -> Duration {
        if self.iterations == 0 {
            Duration::ZERO
        } else {
            self.total / self.iterations
        }
    }
}

/// Run `step` until `budget` is exhausted.
///
/// The elapsed cap is checked before each iteration, so the iteration that crosses it still
/// counts. `step` reports the duration of the call it timed.
pub fn run_budgeted<F>(budget: LoopBudget, mut step: F) -> FilterResult<LoopStats>
where
    F: FnMut() -> FilterResult<Duration>,
{
    let cap = budget.max_elapsed();
    let mut stats = LoopStats::default();
    while stats.iterations < budget.max_iterations && stats.total < cap {
        let d = step()?;
        stats.iterations += 1;
        stats.total += d;
        stats.max_iteration = stats.max_iteration.max(d);
    }
    Ok(stats)
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Outcome of a completed two-phase benchmark.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchmarkResult {
    /// Name of the benchmarked backend.
    pub backend: String,
    /// Filter that was run.
    pub filter: FilterKind,
    /// Control value the run was started with.
    pub control: ControlValue,
    /// Filter parameter the control mapped to.
    pub parameter: f32,
    /// Calls made during warmup; their timings are discarded.
    pub warmup_iterations: u32,
    /// Calls made during measurement.
    pub iterations: u32,
    /// Summed measured call time in milliseconds.
    pub total_elapsed_ms: f64,
    /// Mean measured call time in milliseconds.
    pub average_ms: f64,
    /// Slowest measured call in milliseconds.
    pub max_iteration_ms: f64,
}

impl BenchmarkResult {
    fn from_stats(
        backend: &str,
        param: FilterParameter,
        warmup: LoopStats,
        measured: LoopStats,
    ) -> Self {
        Self {
            backend: backend.to_owned(),
            filter: param.kind,
            control: param.control,
            parameter: param.value,
            warmup_iterations: warmup.iterations,
            iterations: measured.iterations,
            total_elapsed_ms: duration_ms(measured.total),
            average_ms: duration_ms(measured.average()),
            max_iteration_ms: duration_ms(measured.max_iteration),
        }
    }
}

/// Warmup phase (discarded) followed by a measured phase, both budget-capped.
#[derive(Clone, Copy, Debug)]
pub struct Benchmarker {
    warmup: LoopBudget,
    measurement: LoopBudget,
}

impl Default for Benchmarker {
    fn default() -> Self {
        Self {
            warmup: LoopBudget::WARMUP,
            measurement: LoopBudget::MEASUREMENT,
        }
    }
}

impl Benchmarker {
    /// Validate both budgets.
    pub fn new(warmup: LoopBudget, measurement: LoopBudget) -> FilterResult<Self> {
        warmup.validate("warmup")?;
        measurement.validate("measurement")?;
        Ok(Self {
            warmup,
            measurement,
        })
    }

    /// Benchmark an already-exclusive backend on the calling thread.
    #[tracing::instrument(skip_all, fields(backend = backend.name(), control = param.control.get()))]
    pub fn run(
        &self,
        backend: &mut dyn FilterBackend,
        param: FilterParameter,
    ) -> FilterResult<BenchmarkResult> {
        let mut step = || -> FilterResult<Duration> {
            let started = Instant::now();
            backend.apply(param, BENCHMARK_SLOT)?;
            Ok(started.elapsed())
        };
        let warmup = run_budgeted(self.warmup, &mut step)?;
        let measured = run_budgeted(self.measurement, &mut step)?;
        let result = BenchmarkResult::from_stats(backend.name(), param, warmup, measured);
        tracing::info!(
            backend = %result.backend,
            filter = result.filter.as_str(),
            control = result.control.get(),
            iterations = result.iterations,
            average_ms = result.average_ms,
            "benchmark finished"
        );
        Ok(result)
    }

    /// Benchmark a lane, holding its execution lock for both phases.
    pub fn run_on_lane(
        &self,
        lane: &BackendLane,
        param: FilterParameter,
    ) -> FilterResult<BenchmarkResult> {
        let mut state = lane.lock()?;
        self.run(state.backend_mut(), param)
    }

    /// Run on a dedicated thread and report start, result, or failure through `display`.
    ///
    /// The thread yields the result on success; a failure is only delivered to `display`.
    pub fn spawn(
        self,
        lane: Arc<BackendLane>,
        param: FilterParameter,
        display: DisplayHandle,
    ) -> FilterResult<JoinHandle<Option<BenchmarkResult>>> {
        let handle = std::thread::Builder::new()
            .name("filterbench-benchmark".to_owned())
            .spawn(move || {
                display.publish(DisplayEvent::BenchmarkStarted {
                    backend: lane.name(),
                    filter: param.kind,
                    control: param.control,
                });
                match self.run_on_lane(&lane, param) {
                    Ok(result) => {
                        display.publish(DisplayEvent::BenchmarkFinished(result.clone()));
                        Some(result)
                    }
                    Err(error) => {
                        tracing::warn!(backend = lane.name(), error = %error, "benchmark failed");
                        display.publish(DisplayEvent::BenchmarkFailed {
                            backend: lane.name(),
                            error,
                        });
                        None
                    }
                }
            })
            .context("spawn benchmark thread")?;
        Ok(handle)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/benchmark.rs"]
mod tests;
