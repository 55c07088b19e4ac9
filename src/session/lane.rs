use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::core::PixelBuffer;
use crate::foundation::error::{FilterError, FilterResult};
use crate::render::backend::FilterBackend;
use crate::render::slots::next_slot;

/// State guarded by a lane's execution lock.
pub struct LaneState {
    backend: Box<dyn FilterBackend>,
    slot_count: usize,
    next_slot: usize,
}

impl LaneState {
    /// The backend; only reachable while the lock is held.
    pub fn backend_mut(&mut self) -> &mut dyn FilterBackend {
        self.backend.as_mut()
    }

    /// Slot the next interactive execution writes into.
    pub fn next_slot(&self) -> usize {
        self.next_slot
    }

    /// Rotate to the following slot after a successful publish.
    pub fn advance_slot(&mut self) {
        self.next_slot = next_slot(self.next_slot, self.slot_count);
    }
}

/// One configured backend behind the mutual-exclusion lock that serializes every call into it.
///
/// Previews and benchmarks share a lane; the slot rotation index lives under the same lock so
/// only the holder issuing an execution can read or advance it.
pub struct BackendLane {
    name: &'static str,
    state: Mutex<LaneState>,
}

impl BackendLane {
    /// Configure `backend` against `input` and wrap it in a lane.
    pub fn configure(
        mut backend: Box<dyn FilterBackend>,
        input: Arc<PixelBuffer>,
        slot_count: usize,
    ) -> FilterResult<Self> {
        backend.configure(input, slot_count)?;
        Ok(Self {
            name: backend.name(),
            state: Mutex::new(LaneState {
                backend,
                slot_count,
                next_slot: 0,
            }),
        })
    }

    /// Name of the wrapped backend.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Acquire the execution lock.
    pub fn lock(&self) -> FilterResult<MutexGuard<'_, LaneState>> {
        self.state.lock().map_err(|_| {
            FilterError::invalid_state(format!("execution lock for '{}' is poisoned", self.name))
        })
    }

    /// Release the backend's native resources. Waits for any execution holding the lock.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.backend.cleanup();
        state.next_slot = 0;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/lane.rs"]
mod tests;
