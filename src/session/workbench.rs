use std::sync::Arc;
use std::thread::JoinHandle;

use crate::foundation::config::WorkbenchOpts;
use crate::foundation::core::{ControlValue, FilterKind, PixelBuffer};
use crate::foundation::error::{FilterError, FilterResult};
use crate::render::backend::{BackendKind, BackendSettings, FilterBackend, create_backend};
use crate::session::benchmark::{BenchmarkResult, Benchmarker};
use crate::session::display::DisplayHandle;
use crate::session::lane::BackendLane;
use crate::session::preview::{PreviewOutcome, PreviewScheduler, PreviewStats, PreviewTicket};

/// Controller over every registered backend: selection, previews, benchmarks, lifecycle.
///
/// All backends are configured against the same input when the workbench is built and cleaned
/// up by [`Workbench::shutdown`] (or on drop). While a benchmark runs, interactive calls are
/// rejected with [`FilterError::InvalidState`].
pub struct Workbench {
    lanes: Vec<Arc<BackendLane>>,
    selected: usize,
    filter: FilterKind,
    control: ControlValue,
    scheduler: PreviewScheduler,
    benchmarker: Benchmarker,
    display: DisplayHandle,
    benchmark: Option<JoinHandle<Option<BenchmarkResult>>>,
    shut_down: bool,
}

impl Workbench {
    /// Configure `backends` in order. The first one is selected.
    ///
    /// If any backend fails to configure, those already configured are cleaned up.
    #[tracing::instrument(skip_all, fields(backends = backends.len()))]
    pub fn new(
        input: Arc<PixelBuffer>,
        backends: Vec<Box<dyn FilterBackend>>,
        opts: &WorkbenchOpts,
        display: DisplayHandle,
    ) -> FilterResult<Self> {
        opts.validate()?;
        let benchmarker = Benchmarker::new(opts.warmup, opts.measurement)?;
        if backends.is_empty() {
            return Err(FilterError::validation("workbench needs at least one backend"));
        }

        let mut lanes: Vec<Arc<BackendLane>> = Vec::with_capacity(backends.len());
        for backend in backends {
            let name = backend.name();
            let configured = if lanes.iter().any(|l| l.name() == name) {
                Err(FilterError::validation(format!("backend '{name}' registered twice")))
            } else {
                BackendLane::configure(backend, Arc::clone(&input), opts.slot_count)
            };
            match configured {
                Ok(lane) => lanes.push(Arc::new(lane)),
                Err(e) => {
                    for lane in &lanes {
                        lane.shutdown();
                    }
                    return Err(e);
                }
            }
        }
        tracing::info!(
            backends = ?lanes.iter().map(|l| l.name()).collect::<Vec<_>>(),
            width = input.width,
            height = input.height,
            "workbench ready"
        );

        Ok(Self {
            lanes,
            selected: 0,
            filter: FilterKind::Blur,
            control: opts.initial_control,
            scheduler: PreviewScheduler::new(display.clone()),
            benchmarker,
            display,
            benchmark: None,
            shut_down: false,
        })
    }

    /// Build and register one backend per kind.
    pub fn from_kinds(
        input: Arc<PixelBuffer>,
        kinds: &[BackendKind],
        opts: &WorkbenchOpts,
        display: DisplayHandle,
    ) -> FilterResult<Self> {
        let settings = BackendSettings {
            downsample_factor: opts.downsample_factor,
        };
        let backends = kinds
            .iter()
            .map(|&kind| create_backend(kind, &settings))
            .collect::<FilterResult<Vec<_>>>()?;
        Self::new(input, backends, opts, display)
    }

    /// Registered backend names in selection order.
    pub fn backends(&self) -> Vec<&'static str> {
        self.lanes.iter().map(|l| l.name()).collect()
    }

    /// Name of the backend previews and benchmarks run on.
    pub fn selected_backend(&self) -> &'static str {
        self.lanes[self.selected].name()
    }

    /// Currently selected filter.
    pub fn filter(&self) -> FilterKind {
        self.filter
    }

    /// Last control value submitted (or the configured initial value).
    pub fn control(&self) -> ControlValue {
        self.control
    }

    /// Switch backend by name and re-run the preview with the current control value.
    pub fn select_backend(&mut self, name: &str) -> FilterResult<PreviewTicket> {
        self.ensure_interactive()?;
        let index = self
            .lanes
            .iter()
            .position(|l| l.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| FilterError::validation(format!("backend '{name}' is not registered")))?;
        self.selected = index;
        self.submit_current()
    }

    /// Switch filter and re-run the preview with the current control value.
    pub fn select_filter(&mut self, kind: FilterKind) -> FilterResult<PreviewTicket> {
        self.ensure_interactive()?;
        self.filter = kind;
        self.submit_current()
    }

    /// Record a new control value and schedule a preview for it.
    pub fn submit_control(&mut self, control: ControlValue) -> FilterResult<PreviewTicket> {
        self.ensure_interactive()?;
        self.control = control;
        self.submit_current()
    }

    /// Re-run the preview for the current selection.
    pub fn refresh(&mut self) -> FilterResult<PreviewTicket> {
        self.ensure_interactive()?;
        self.submit_current()
    }

    /// Benchmark the selected backend at the current control value on a background thread.
    pub fn start_benchmark(&mut self) -> FilterResult<()> {
        self.ensure_interactive()?;
        if let Some(finished) = self.benchmark.take() {
            join_benchmark(finished)?;
        }
        let lane = Arc::clone(&self.lanes[self.selected]);
        let param = self.filter.parameter(self.control);
        tracing::info!(
            backend = lane.name(),
            filter = self.filter.as_str(),
            control = self.control.get(),
            "benchmark started"
        );
        let handle = self.benchmarker.spawn(lane, param, self.display.clone())?;
        self.benchmark = Some(handle);
        Ok(())
    }

    /// Whether the benchmark thread is still alive.
    pub fn is_benchmark_running(&self) -> bool {
        self.benchmark.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Block until the last started benchmark ends. `None` when it failed or none was started.
    pub fn wait_benchmark(&mut self) -> FilterResult<Option<BenchmarkResult>> {
        match self.benchmark.take() {
            Some(handle) => join_benchmark(handle),
            None => Ok(None),
        }
    }

    /// Block until every outstanding preview has resolved.
    pub fn wait_idle(&self) -> Vec<PreviewOutcome> {
        self.scheduler.wait_idle()
    }

    /// Preview outcome counters.
    pub fn preview_stats(&self) -> PreviewStats {
        self.scheduler.stats()
    }

    /// Wait for outstanding work, then release every backend. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.scheduler.wait_idle();
        if let Some(handle) = self.benchmark.take()
            && let Err(e) = join_benchmark(handle)
        {
            tracing::warn!(error = %e, "benchmark ended abnormally during shutdown");
        }
        for lane in &self.lanes {
            lane.shutdown();
        }
        tracing::info!("workbench shut down");
    }

    fn ensure_interactive(&self) -> FilterResult<()> {
        if self.shut_down {
            return Err(FilterError::invalid_state("workbench has been shut down"));
        }
        if self.is_benchmark_running() {
            return Err(FilterError::invalid_state("a benchmark is running"));
        }
        Ok(())
    }

    fn submit_current(&self) -> FilterResult<PreviewTicket> {
        let lane = Arc::clone(&self.lanes[self.selected]);
        self.scheduler.submit(lane, self.filter.parameter(self.control))
    }
}

impl Drop for Workbench {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join_benchmark(
    handle: JoinHandle<Option<BenchmarkResult>>,
) -> FilterResult<Option<BenchmarkResult>> {
    handle
        .join()
        .map_err(|_| FilterError::invalid_state("benchmark thread panicked"))
}

#[cfg(test)]
#[path = "../../tests/unit/session/workbench.rs"]
mod tests;
