// Immutable grayscale pixel buffer backing the simulated line-scan camera.
//
// The buffer is constructed once at startup and read-only afterwards. Rows
// are handed out as refcounted slices of the backing storage, so emitting a
// row never copies pixel data.

use bytes::Bytes;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Widest row the scanner emits; wider source images are clipped.
pub const MAX_WIDTH: u32 = 8192;
/// Tallest source image accepted; taller images are clipped.
pub const MAX_HEIGHT: u32 = 8192;
/// Height of the synthetic fallback buffer.
pub const MAX_LINES: u32 = 1200;

/// Result type for scan source operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur while building a scan source
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid buffer dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Pixel buffer length {len} does not match {width}x{height}")]
    LengthMismatch { len: usize, width: u32, height: u32 },
}

/// Row-major 8-bit grayscale buffer, one byte per pixel
pub struct LineBuffer {
    width: u32,
    height: u32,
    pixels: Bytes,
}

impl LineBuffer {
    /// Build a buffer from raw row-major pixels, validating dimensions
    pub fn from_pixels(width: u32, height: u32, pixels: impl Into<Bytes>) -> ScanResult<Self> {
        if width == 0 || height == 0 || width > MAX_WIDTH || height > MAX_HEIGHT {
            return Err(ScanError::InvalidDimensions { width, height });
        }
        let pixels = pixels.into();
        if pixels.len() != width as usize * height as usize {
            return Err(ScanError::LengthMismatch {
                len: pixels.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode an image file into a grayscale buffer, clipping oversized
    /// dimensions to the scanner limits
    pub fn load(path: &Path) -> ScanResult<Self> {
        let gray = image::open(path)?.to_luma8();
        let (width, height) = gray.dimensions();
        let clip_w = width.min(MAX_WIDTH);
        let clip_h = height.min(MAX_HEIGHT);
        let gray = if (clip_w, clip_h) != (width, height) {
            image::imageops::crop_imm(&gray, 0, 0, clip_w, clip_h).to_image()
        } else {
            gray
        };
        Self::from_pixels(clip_w, clip_h, gray.into_raw())
    }

    /// All-zero synthetic buffer used when no source image is available
    pub fn fallback() -> Self {
        Self {
            width: MAX_WIDTH,
            height: MAX_LINES,
            pixels: Bytes::from(vec![0u8; MAX_WIDTH as usize * MAX_LINES as usize]),
        }
    }

    /// Resolve the scan source: the configured override first, then the
    /// bundled default, then the synthetic fallback. Load failures are
    /// recovered here and never reach the session layer.
    pub fn load_or_fallback(override_path: Option<&Path>, default_path: &Path) -> Self {
        for path in override_path.into_iter().chain(std::iter::once(default_path)) {
            if !path.exists() {
                debug!("Scan source candidate {} does not exist", path.display());
                continue;
            }
            match Self::load(path) {
                Ok(buffer) => {
                    info!(
                        "Loaded scan source {} ({}x{})",
                        path.display(),
                        buffer.width,
                        buffer.height
                    );
                    return buffer;
                }
                Err(e) => {
                    warn!("Failed to load scan source {}: {}", path.display(), e);
                }
            }
        }

        info!(
            "No scan source image available, using synthetic {}x{} buffer",
            MAX_WIDTH, MAX_LINES
        );
        Self::fallback()
    }

    /// Pixels per row
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Zero-copy view of the row at `index`. Callers go through the scan
    /// cursor, which keeps the index in range.
    pub fn row(&self, index: u32) -> Bytes {
        debug_assert!(index < self.height);
        let start = index as usize * self.width as usize;
        self.pixels.slice(start..start + self.width as usize)
    }
}
