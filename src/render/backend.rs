use std::sync::Arc;

use serde::Serialize;

use crate::foundation::config::DEFAULT_DOWNSAMPLE_FACTOR;
use crate::foundation::core::{FilterParameter, PixelBuffer};
use crate::foundation::error::{FilterError, FilterResult};

/// An execution backend that owns the native resources needed to run a parameterized filter.
///
/// Lifecycle: `configure` once, `apply` any number of times, `cleanup` once. A backend may be
/// configured again after `cleanup`. Implementations are not required to be safe for concurrent
/// `apply`; callers serialize access through [`crate::BackendLane`].
pub trait FilterBackend: Send {
    /// Stable display name, used in logs and benchmark results.
    fn name(&self) -> &'static str;

    /// Whether `configure` has run without a matching `cleanup`.
    fn is_configured(&self) -> bool;

    /// Allocate every resource sized to `input` and `slot_count`.
    ///
    /// Fails with [`FilterError::InvalidState`] when already configured.
    fn configure(&mut self, input: Arc<PixelBuffer>, slot_count: usize) -> FilterResult<()>;

    /// Run the filter synchronously and return the written output slot.
    ///
    /// Fails with [`FilterError::NotConfigured`] outside a `configure`/`cleanup` bracket and with
    /// [`FilterError::ResourceAcquisition`] when no result buffer could be obtained.
    fn apply(&mut self, param: FilterParameter, slot: usize) -> FilterResult<Arc<PixelBuffer>>;

    /// Release everything `configure` acquired. No-op when not configured.
    fn cleanup(&mut self);
}

/// Registered backend kinds.
///
/// - `Reference` is always available.
/// - `Gpu` requires the `gpu` cargo feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// wgpu compositing pipeline (downsample + blur).
    #[cfg(feature = "gpu")]
    Gpu,
    /// Full-resolution software blur on the calling thread.
    Reference,
}

impl BackendKind {
    /// Every backend compiled into this build, in selection order.
    pub fn available() -> Vec<BackendKind> {
        vec![
            #[cfg(feature = "gpu")]
            BackendKind::Gpu,
            BackendKind::Reference,
        ]
    }

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            #[cfg(feature = "gpu")]
            Self::Gpu => "gpu",
            Self::Reference => "reference",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = FilterError;

    fn from_str(s: &str) -> FilterResult<Self> {
        BackendKind::available()
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FilterError::validation(format!("unknown or unavailable backend '{s}'")))
    }
}

/// Backend-agnostic construction settings.
#[derive(Clone, Copy, Debug)]
pub struct BackendSettings {
    /// Factor the GPU pipeline shrinks the input by before blurring.
    pub downsample_factor: u32,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            downsample_factor: DEFAULT_DOWNSAMPLE_FACTOR,
        }
    }
}

/// Create an unconfigured backend.
pub fn create_backend(
    kind: BackendKind,
    _settings: &BackendSettings,
) -> FilterResult<Box<dyn FilterBackend>> {
    match kind {
        #[cfg(feature = "gpu")]
        BackendKind::Gpu => Ok(Box::new(crate::render::gpu::GpuBackend::new(*_settings)?)),
        BackendKind::Reference => Ok(Box::new(crate::render::cpu::ReferenceBackend::new())),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
