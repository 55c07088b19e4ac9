use serde::{Deserialize, Serialize};

use crate::foundation::error::{FilterError, FilterResult};

/// Pixel layout of a [`PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8-bit RGBA, tightly packed, row-major.
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
        }
    }
}

/// A decoded image: fixed dimensions, fixed format, owned bytes.
///
/// The input image is shared immutably (`Arc<PixelBuffer>`) for the lifetime of a configured
/// backend. Output slots also hold `Arc<PixelBuffer>` so a published frame can outlive the next
/// write into its slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout of `data`.
    pub format: PixelFormat,
    /// Pixel bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer.
    pub fn zeroed(width: u32, height: u32, format: PixelFormat) -> FilterResult<Self> {
        let len = byte_len(width, height, format)?;
        Ok(Self {
            width,
            height,
            format,
            data: vec![0u8; len],
        })
    }

    /// Wrap existing RGBA8 bytes, checking the length against the dimensions.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> FilterResult<Self> {
        if width == 0 || height == 0 {
            return Err(FilterError::validation("pixel buffer dimensions must be > 0"));
        }
        let expected = byte_len(width, height, PixelFormat::Rgba8)?;
        if data.len() != expected {
            return Err(FilterError::validation(format!(
                "pixel buffer expects {expected} bytes for {width}x{height} rgba8, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            data,
        })
    }

    /// Bytes in one row, without padding.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Whether this buffer has the given shape.
    pub fn has_shape(&self, width: u32, height: u32, format: PixelFormat) -> bool {
        self.width == width && self.height == height && self.format == format
    }
}

fn byte_len(width: u32, height: u32, format: PixelFormat) -> FilterResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(format.bytes_per_pixel()))
        .ok_or_else(|| FilterError::validation("pixel buffer size overflow"))
}

/// A control input in `[0, 100]`, e.g. a slider position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ControlValue(u8);

impl ControlValue {
    /// Lowest control value.
    pub const MIN: Self = Self(0);
    /// Highest control value.
    pub const MAX: Self = Self(100);
    /// Slider midpoint, the initial position.
    pub const MIDPOINT: Self = Self(50);

    /// Validate a raw control value.
    pub fn new(value: u32) -> FilterResult<Self> {
        if value > 100 {
            return Err(FilterError::validation(format!(
                "control value must be in [0, 100], got {value}"
            )));
        }
        Ok(Self(value as u8))
    }

    /// The raw value in `[0, 100]`.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u32> for ControlValue {
    type Error = FilterError;

    fn try_from(value: u32) -> FilterResult<Self> {
        Self::new(value)
    }
}

impl From<ControlValue> for u32 {
    fn from(value: ControlValue) -> Self {
        u32::from(value.0)
    }
}

impl std::fmt::Display for ControlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Linearly map a control value onto `[min, max]`.
pub fn rescale(control: ControlValue, min: f64, max: f64) -> f64 {
    (max - min) * (f64::from(control.get()) / 100.0) + min
}

/// Filter kinds a backend can execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Gaussian blur; the parameter is the blur radius in pixels.
    Blur,
}

impl FilterKind {
    /// Every filter kind, in selection order.
    pub const ALL: [FilterKind; 1] = [FilterKind::Blur];

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blur => "blur",
        }
    }

    /// Inclusive range the control value is mapped onto.
    pub const fn parameter_range(self) -> (f64, f64) {
        match self {
            Self::Blur => (1.0, 50.0),
        }
    }

    /// Map a control value to this filter's parameter.
    pub fn parameter(self, control: ControlValue) -> FilterParameter {
        let (min, max) = self.parameter_range();
        FilterParameter {
            kind: self,
            control,
            value: rescale(control, min, max) as f32,
        }
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter kind bound to a concrete parameter value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterParameter {
    /// Which filter to run.
    pub kind: FilterKind,
    /// Control value the parameter was derived from.
    pub control: ControlValue,
    /// Filter-specific quantity (blur radius for [`FilterKind::Blur`]).
    pub value: f32,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
