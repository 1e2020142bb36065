//! Decoded RGBA rasters and image ingestion.

use std::fmt;
use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::types::{ClassifyError, ClassifyResult};

/// Extractors operate on interior pixels and need a 1-pixel border.
pub const MIN_DIMENSION: u32 = 3;

/// A decoded image: interleaved RGBA bytes, row-major, no padding.
/// Immutable once built; every extractor consumes it read-only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl PixelBuffer {
    /// Build a buffer from raw RGBA bytes. The byte length must be
    /// exactly `width * height * 4` and the area must be non-zero.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> ClassifyResult<Self> {
        if width == 0 || height == 0 {
            return Err(ClassifyError::InvalidInput(
                "raster must have a non-zero area".to_string(),
            ));
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ClassifyError::InvalidInput(format!(
                "raster byte length {} does not match {}x{} RGBA",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert any decoded image to an RGBA buffer.
    pub fn from_image(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            data: rgba.into_raw(),
        }
    }

    /// Decode an image file from disk.
    pub fn open(path: impl AsRef<Path>) -> ClassifyResult<Self> {
        let img = image::open(path)?;
        Ok(Self::from_image(&img))
    }

    /// Decode an image from in-memory encoded bytes.
    pub fn from_memory(bytes: &[u8]) -> ClassifyResult<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(&img))
    }

    /// Decode an image from base64 data with a MIME hint.
    pub fn from_base64(data: &str, mime: &str) -> ClassifyResult<Self> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| ClassifyError::InvalidInput(format!("invalid base64: {e}")))?;

        let format = match mime {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            "image/gif" => Some(ImageFormat::Gif),
            _ => None,
        };

        let img = if let Some(fmt) = format {
            image::load_from_memory_with_format(&bytes, fmt)?
        } else {
            image::load_from_memory(&bytes)?
        };
        Ok(Self::from_image(&img))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw interleaved RGBA bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Rebuild an `image` crate view of this buffer, e.g. for resizing
    /// or re-encoding.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.data.clone()).unwrap_or_else(|| {
            tracing::warn!("raster bytes inconsistent with dimensions, substituting blank image");
            RgbaImage::new(self.width, self.height)
        })
    }

    /// Re-encode as PNG for display or export.
    pub fn to_png(&self) -> ClassifyResult<Vec<u8>> {
        let mut buf = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buf);
        self.to_image().write_to(&mut cursor, ImageFormat::Png)?;
        Ok(buf)
    }

    /// Red channel byte at (x, y). Extractors use red as a single-channel
    /// grayscale approximation.
    #[inline]
    pub(crate) fn red(&self, x: u32, y: u32) -> u8 {
        self.data[(y as usize * self.width as usize + x as usize) * 4]
    }

    /// Reject buffers without an interior, and buffers whose byte length
    /// disagrees with their dimensions (possible via deserialization).
    pub(crate) fn require_interior(&self) -> ClassifyResult<()> {
        if self.width < MIN_DIMENSION || self.height < MIN_DIMENSION {
            return Err(ClassifyError::BufferTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width as usize * self.height as usize * 4;
        if self.data.len() != expected {
            return Err(ClassifyError::InvalidInput(format!(
                "raster byte length {} does not match {}x{} RGBA",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

/// Check if a file path points to a supported image format.
pub fn is_supported_format(path: &str) -> bool {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    matches!(
        ext.as_str(),
        "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp" | "tiff" | "tif" | "ico"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_byte_length() {
        assert!(PixelBuffer::new(2, 2, vec![0; 16]).is_ok());
        assert!(PixelBuffer::new(2, 2, vec![0; 15]).is_err());
        assert!(PixelBuffer::new(0, 4, Vec::new()).is_err());
    }

    #[test]
    fn from_image_preserves_dimensions() {
        let img = DynamicImage::new_rgb8(7, 5);
        let buf = PixelBuffer::from_image(&img);
        assert_eq!(buf.width(), 7);
        assert_eq!(buf.height(), 5);
        assert_eq!(buf.data().len(), 7 * 5 * 4);
    }

    #[test]
    fn require_interior_rejects_small_buffers() {
        let buf = PixelBuffer::new(2, 8, vec![0; 2 * 8 * 4]).unwrap();
        assert!(matches!(
            buf.require_interior(),
            Err(ClassifyError::BufferTooSmall {
                width: 2,
                height: 8
            })
        ));
        let buf = PixelBuffer::new(3, 3, vec![0; 36]).unwrap();
        assert!(buf.require_interior().is_ok());
    }

    #[test]
    fn png_roundtrip() {
        let mut data = vec![0u8; 4 * 4 * 4];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&[200, 40, 10, 255]);
        }
        let buf = PixelBuffer::new(4, 4, data).unwrap();
        let png = buf.to_png().unwrap();
        let decoded = PixelBuffer::from_memory(&png).unwrap();
        assert_eq!(decoded, buf);
    }

    #[test]
    fn supported_formats() {
        assert!(is_supported_format("test.png"));
        assert!(is_supported_format("test.JPG"));
        assert!(is_supported_format("test.webp"));
        assert!(!is_supported_format("test.txt"));
        assert!(!is_supported_format("test"));
    }
}
