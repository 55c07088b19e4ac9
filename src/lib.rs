//! filterbench compares interchangeable image-filter backends on the same input.
//!
//! A GPU compositing pipeline (behind the `gpu` feature) and a reference software backend
//! implement one contract ([`FilterBackend`]). Two sessions drive them:
//!
//! 1. **Preview**: control changes are submitted to a latest-wins [`PreviewScheduler`]. Work that
//!    is stale when it gets the backend is skipped; work that starts is always displayed.
//! 2. **Benchmark**: a [`Benchmarker`] runs a budget-capped warmup phase and a budget-capped
//!    measured phase and reports the average per-call latency.
//!
//! Every call into a backend is serialized by its [`BackendLane`]. Results reach the display
//! collaborator as [`DisplayEvent`]s over a channel, so core threads never touch the display.
//! [`Workbench`] ties backends, selection, both sessions and cleanup together.
#![forbid(unsafe_code)]

mod assets;
mod effects;
mod foundation;
mod render;
mod session;

pub use assets::decode::{decode_image, load_image, save_png};
pub use effects::blur::{BlurKernel, kernel_reach, sigma_for_radius};
pub use foundation::config::{DEFAULT_DOWNSAMPLE_FACTOR, DEFAULT_SLOT_COUNT, WorkbenchOpts};
pub use foundation::core::{
    ControlValue, FilterKind, FilterParameter, PixelBuffer, PixelFormat, rescale,
};
pub use foundation::error::{FilterError, FilterResult};
pub use render::backend::{BackendKind, BackendSettings, FilterBackend, create_backend};
pub use render::cpu::ReferenceBackend;
#[cfg(feature = "gpu")]
pub use render::gpu::GpuBackend;
pub use render::slots::{OutputSlots, next_slot};
pub use session::benchmark::{
    BENCHMARK_SLOT, BenchmarkResult, Benchmarker, LoopBudget, LoopStats, run_budgeted,
};
pub use session::display::{
    DisplayEvent, DisplayHandle, DisplayQueue, DisplaySink, InMemorySink, PreviewFrame,
    display_channel,
};
pub use session::lane::{BackendLane, LaneState};
pub use session::preview::{PreviewOutcome, PreviewScheduler, PreviewStats, PreviewTicket};
pub use session::workbench::Workbench;
