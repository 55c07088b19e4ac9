use crate::foundation::core::{PixelBuffer, PixelFormat};
use crate::foundation::error::{FilterError, FilterResult};

/// Blur radius to Gaussian sigma, the mapping compositors use for "radius" blurs.
pub fn sigma_for_radius(radius: f32) -> f32 {
    if !radius.is_finite() || radius <= 0.0 {
        return 0.0;
    }
    0.577_35 * radius + 0.5
}

/// Half-width of the sampled kernel for a sigma (three standard deviations).
pub fn kernel_reach(sigma: f32) -> u32 {
    if sigma <= 0.0 {
        return 0;
    }
    (3.0 * sigma).ceil() as u32
}

/// Normalized separable Gaussian kernel in Q16 fixed point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlurKernel {
    radius_bits: u32,
    reach: u32,
    weights: Vec<u32>,
}

impl BlurKernel {
    /// Build the kernel for a blur radius in pixels.
    ///
    /// Weights are sampled from the Gaussian, normalized, quantized to Q16, and the rounding
    /// remainder is folded into the center tap so they sum to exactly `1 << 16`.
    pub fn for_radius(radius: f32) -> FilterResult<Self> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(FilterError::validation(format!(
                "blur radius must be finite and >= 0, got {radius}"
            )));
        }
        let sigma = sigma_for_radius(radius);
        let reach = kernel_reach(sigma);
        let weights = if reach == 0 {
            vec![Q16_ONE]
        } else {
            let two_sigma_sq = 2.0 * f64::from(sigma).powi(2);
            let span = i64::from(reach);
            let density: Vec<f64> = (-span..=span)
                .map(|d| (-((d * d) as f64) / two_sigma_sq).exp())
                .collect();
            let total: f64 = density.iter().sum();
            let mut q: Vec<u32> = density
                .iter()
                .map(|p| (p / total * f64::from(Q16_ONE)).round() as u32)
                .collect();
            let quantized: u32 = q.iter().sum();
            let center = q.len() / 2;
            q[center] = (q[center] + Q16_ONE).saturating_sub(quantized);
            q
        };
        Ok(Self {
            radius_bits: radius.to_bits(),
            reach,
            weights,
        })
    }

    /// Whether this kernel was built for `radius`.
    pub fn matches(&self, radius: f32) -> bool {
        self.radius_bits == radius.to_bits()
    }

    /// Taps on each side of the center.
    pub fn reach(&self) -> u32 {
        self.reach
    }

    /// Q16 weights, `2 * reach + 1` entries summing to `1 << 16`.
    pub fn weights(&self) -> &[u32] {
        &self.weights
    }
}

/// Blur `src` into `dst` with clamped edges. `scratch` is reused between calls.
pub fn blur_rgba8_into(
    src: &PixelBuffer,
    dst: &mut PixelBuffer,
    kernel: &BlurKernel,
    scratch: &mut Vec<u8>,
) -> FilterResult<()> {
    if src.format != PixelFormat::Rgba8 {
        return Err(FilterError::validation("blur expects rgba8 input"));
    }
    if !dst.has_shape(src.width, src.height, src.format) {
        return Err(FilterError::validation(
            "blur output must match input dimensions and format",
        ));
    }
    if src.data.len() != dst.data.len() {
        return Err(FilterError::validation(
            "blur expects src matching width*height*4",
        ));
    }
    if kernel.reach == 0 {
        dst.data.copy_from_slice(&src.data);
        return Ok(());
    }

    let (w, h) = (src.width as usize, src.height as usize);
    scratch.resize(src.data.len(), 0);
    let rows = Axis {
        lines: h,
        len: w,
        line_step: w,
        tap_step: 1,
    };
    let columns = Axis {
        lines: w,
        len: h,
        line_step: 1,
        tap_step: w,
    };
    convolve_axis(&src.data, scratch, rows, &kernel.weights);
    convolve_axis(scratch, &mut dst.data, columns, &kernel.weights);
    Ok(())
}

const Q16_ONE: u32 = 1 << 16;

/// One pass direction, in pixel units: `lines` independent lines of `len` pixels.
#[derive(Clone, Copy)]
struct Axis {
    lines: usize,
    len: usize,
    line_step: usize,
    tap_step: usize,
}

fn convolve_axis(src: &[u8], dst: &mut [u8], axis: Axis, weights: &[u32]) {
    let reach = weights.len() / 2;
    let last = axis.len - 1;
    for line in 0..axis.lines {
        let base = line * axis.line_step;
        for i in 0..axis.len {
            let mut acc = [0u64; 4];
            for (t, &wt) in weights.iter().enumerate() {
                // Clamp-to-edge: taps past either end reuse the boundary pixel.
                let j = (i + t).saturating_sub(reach).min(last);
                let at = (base + j * axis.tap_step) * 4;
                for (a, &v) in acc.iter_mut().zip(&src[at..at + 4]) {
                    *a += u64::from(wt) * u64::from(v);
                }
            }
            let out = (base + i * axis.tap_step) * 4;
            for (d, a) in dst[out..out + 4].iter_mut().zip(acc) {
                *d = ((a + u64::from(Q16_ONE / 2)) >> 16).min(255) as u8;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
