use std::sync::Arc;

use crate::effects::blur::{BlurKernel, blur_rgba8_into};
use crate::foundation::core::{FilterKind, FilterParameter, PixelBuffer};
use crate::foundation::error::{FilterError, FilterResult};
use crate::render::backend::FilterBackend;
use crate::render::slots::OutputSlots;

struct Configured {
    input: Arc<PixelBuffer>,
    slots: OutputSlots,
    kernel: Option<BlurKernel>,
    scratch: Vec<u8>,
}

/// Software baseline: full-resolution separable blur on the calling thread.
///
/// `configure` only records the input and allocates the output slots; there is no persistent
/// pipeline beyond the last kernel and an intermediate row buffer.
#[derive(Default)]
pub struct ReferenceBackend {
    state: Option<Configured>,
}

impl ReferenceBackend {
    /// Create an unconfigured backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FilterBackend for ReferenceBackend {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    fn configure(&mut self, input: Arc<PixelBuffer>, slot_count: usize) -> FilterResult<()> {
        if self.state.is_some() {
            return Err(FilterError::invalid_state(
                "reference backend configured twice without cleanup",
            ));
        }
        let slots = OutputSlots::allocate(slot_count, input.width, input.height, input.format)?;
        tracing::debug!(
            width = input.width,
            height = input.height,
            slot_count,
            "reference backend configured"
        );
        self.state = Some(Configured {
            input,
            slots,
            kernel: None,
            scratch: Vec::new(),
        });
        Ok(())
    }

    fn apply(&mut self, param: FilterParameter, slot: usize) -> FilterResult<Arc<PixelBuffer>> {
        let state = self.state.as_mut().ok_or(FilterError::NotConfigured)?;
        match param.kind {
            FilterKind::Blur => {
                let radius = param.value;
                if !state.kernel.as_ref().is_some_and(|k| k.matches(radius)) {
                    state.kernel = Some(BlurKernel::for_radius(radius)?);
                }
                let kernel = state
                    .kernel
                    .as_ref()
                    .ok_or_else(|| FilterError::invalid_state("blur kernel missing after build"))?;
                let out = state.slots.write(slot)?;
                blur_rgba8_into(&state.input, out, kernel, &mut state.scratch)?;
            }
        }
        state.slots.publish(slot)
    }

    fn cleanup(&mut self) {
        if self.state.take().is_some() {
            tracing::debug!("reference backend cleaned up");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
