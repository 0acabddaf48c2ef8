//! Alpha compositing of scene tiles.

use image::{imageops, ImageFormat, RgbaImage};
use std::io::Cursor;

use crate::error::{MosaicError, Result};

/// Fully transparent tile.
pub fn blank_tile(size: u32) -> RgbaImage {
    RgbaImage::new(size, size)
}

/// Stacks `layers` (newest first) so the newest ends up on top.
///
/// Layers are drawn from the last to the first with alpha "over". Every
/// layer must have the dimensions of the first one.
pub fn composite(layers: &[RgbaImage]) -> Result<RgbaImage> {
    let Some(first) = layers.first() else {
        return Err(MosaicError::Internal("nothing to composite".to_string()));
    };
    let expected = first.dimensions();

    if let Some(odd) = layers.iter().find(|layer| layer.dimensions() != expected) {
        return Err(MosaicError::Consistency {
            expected,
            found: odd.dimensions(),
        });
    }

    let mut canvas = RgbaImage::new(expected.0, expected.1);
    for layer in layers.iter().rev() {
        imageops::overlay(&mut canvas, layer, 0, 0);
    }
    Ok(canvas)
}

/// Encodes an image as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| MosaicError::Internal(format!("png encode: {}", e)))?;
    Ok(buffer.into_inner())
}

/// Decodes a PNG body into RGBA pixels.
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|e| MosaicError::InvalidResponse(format!("png decode: {}", e)))
}
