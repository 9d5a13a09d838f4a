// SPDX-License-Identifier: GPL-3.0-only

//! Frame input and image output
//!
//! - [`raw_file`]: raw `.yuv` frame streams in and out
//! - [`save_png`]: RGBA snapshots to PNG

pub mod raw_file;

pub use raw_file::{RawFrameReader, RawFrameWriter};

use crate::errors::{AppError, AppResult};
use std::path::Path;
use tracing::info;

/// Encode packed RGBA pixels as PNG bytes
pub fn encode_png(width: u32, height: u32, rgba: Vec<u8>) -> AppResult<Vec<u8>> {
    let image = image::RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        AppError::Image(format!("RGBA buffer does not match {}x{}", width, height))
    })?;

    let mut buffer = Vec::new();
    image.write_to(
        &mut std::io::Cursor::new(&mut buffer),
        image::ImageFormat::Png,
    )?;
    Ok(buffer)
}

/// Write packed RGBA pixels to a PNG file
pub fn save_png(path: &Path, width: u32, height: u32, rgba: Vec<u8>) -> AppResult<()> {
    let bytes = encode_png(width, height, rgba)?;
    std::fs::write(path, bytes)?;
    info!(path = %path.display(), width, height, "PNG saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(2, 2, vec![255u8; 16]).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_encode_png_size_mismatch() {
        assert!(matches!(
            encode_png(2, 2, vec![0u8; 15]),
            Err(AppError::Image(_))
        ));
    }
}
