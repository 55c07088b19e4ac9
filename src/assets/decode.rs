use std::path::Path;

use anyhow::Context;

use crate::foundation::core::{PixelBuffer, PixelFormat};
use crate::foundation::error::{FilterError, FilterResult};

/// Decode encoded image bytes into a straight-alpha RGBA8 buffer.
pub fn decode_image(bytes: &[u8]) -> FilterResult<PixelBuffer> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    PixelBuffer::from_rgba8(width, height, rgba.into_raw())
}

/// Read and decode an image file.
pub fn load_image(path: &Path) -> FilterResult<PixelBuffer> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    let buf = decode_image(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        width = buf.width,
        height = buf.height,
        "input image loaded"
    );
    Ok(buf)
}

/// Write `buf` as a PNG, creating parent directories as needed.
pub fn save_png(path: &Path, buf: &PixelBuffer) -> FilterResult<()> {
    if buf.format != PixelFormat::Rgba8 {
        return Err(FilterError::validation("png output requires rgba8 pixels"));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        path,
        &buf.data,
        buf.width,
        buf.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
