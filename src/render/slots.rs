use std::sync::Arc;

use crate::foundation::core::{PixelBuffer, PixelFormat};
use crate::foundation::error::{FilterError, FilterResult};

/// A fixed set of pre-allocated output buffers addressed by index.
///
/// Slots are `Arc`-shared with whoever consumes a published frame. Writing into a slot that a
/// consumer still holds detaches a private copy first, so a reader never observes a buffer that a
/// producer is writing.
#[derive(Debug)]
pub struct OutputSlots {
    slots: Vec<Arc<PixelBuffer>>,
}

impl OutputSlots {
    /// Allocate `count` zeroed buffers of the given shape.
    pub fn allocate(count: usize, width: u32, height: u32, format: PixelFormat) -> FilterResult<Self> {
        if count < 2 {
            return Err(FilterError::validation(format!(
                "output slot count must be >= 2, got {count}"
            )));
        }
        let proto = PixelBuffer::zeroed(width, height, format)?;
        let slots = (0..count).map(|_| Arc::new(proto.clone())).collect();
        Ok(Self { slots })
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; a slot set holds at least two buffers.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Mutable access to one slot for the duration of a write.
    pub fn write(&mut self, index: usize) -> FilterResult<&mut PixelBuffer> {
        let count = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            FilterError::validation(format!("output slot {index} out of range (count {count})"))
        })?;
        Ok(Arc::make_mut(slot))
    }

    /// Share the current contents of a slot.
    pub fn publish(&self, index: usize) -> FilterResult<Arc<PixelBuffer>> {
        self.slots.get(index).cloned().ok_or_else(|| {
            FilterError::validation(format!(
                "output slot {index} out of range (count {})",
                self.slots.len()
            ))
        })
    }
}

/// Round-robin successor of `index` in a set of `count` slots.
pub fn next_slot(index: usize, count: usize) -> usize {
    if count == 0 { 0 } else { (index + 1) % count }
}

#[cfg(test)]
#[path = "../../tests/unit/render/slots.rs"]
mod tests;
