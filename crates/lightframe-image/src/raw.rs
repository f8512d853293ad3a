// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image-data factory: loads a saved capture into an in-memory 16-bit mosaic.

use std::path::Path;

use image::{ImageBuffer, Luma};
use lightframe_core::error::{LightframeError, Result};
use lightframe_core::types::RawConverter;
use tracing::{debug, info, instrument};

/// Single-plane 16-bit sensor data.
pub type MosaicBuffer = ImageBuffer<Luma<u16>, Vec<u16>>;

/// A decoded but unprocessed capture.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pixels: MosaicBuffer,
    bit_depth: u8,
    is_bayered: bool,
}

impl RawFrame {
    /// Wrap an existing mosaic. `bit_depth` is clamped to 1..=16.
    pub fn new(pixels: MosaicBuffer, bit_depth: u8, is_bayered: bool) -> Self {
        Self {
            pixels,
            bit_depth: bit_depth.clamp(1, 16),
            is_bayered,
        }
    }

    /// Build a frame from row-major samples; `None` if the length does not
    /// match the dimensions.
    pub fn from_samples(
        width: u32,
        height: u32,
        samples: Vec<u16>,
        bit_depth: u8,
        is_bayered: bool,
    ) -> Option<Self> {
        ImageBuffer::from_raw(width, height, samples)
            .map(|pixels| Self::new(pixels, bit_depth, is_bayered))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    pub fn is_bayered(&self) -> bool {
        self.is_bayered
    }

    pub fn pixels(&self) -> &MosaicBuffer {
        &self.pixels
    }

    /// Largest sample value the sensor can produce.
    pub fn white_level(&self) -> f32 {
        ((1u32 << self.bit_depth) - 1) as f32
    }
}

/// Loads raw captures from disk.
///
/// Implemented by the host application's decoder; `FileImageDataFactory` is
/// the built-in one.
pub trait ImageDataFactory: Send + Sync {
    fn load(
        &self,
        path: &Path,
        bit_depth: u8,
        is_bayered: bool,
        converter: RawConverter,
    ) -> Result<RawFrame>;
}

/// Decodes any format the `image` crate reads (TIFF, PNG, ...) into a 16-bit
/// mosaic. Colour files are collapsed to luminance.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageDataFactory;

impl ImageDataFactory for FileImageDataFactory {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn load(
        &self,
        path: &Path,
        bit_depth: u8,
        is_bayered: bool,
        converter: RawConverter,
    ) -> Result<RawFrame> {
        if converter != RawConverter::Internal {
            return Err(LightframeError::UnsupportedConverter(format!(
                "{converter:?} converter is provided by the host application"
            )));
        }

        let decoded = image::open(path).map_err(|err| {
            LightframeError::ImageLoad(format!("failed to open {}: {}", path.display(), err))
        })?;
        debug!(color = ?decoded.color(), "raw file decoded");

        let pixels = decoded.to_luma16();
        info!(
            width = pixels.width(),
            height = pixels.height(),
            bit_depth,
            is_bayered,
            "Raw frame loaded"
        );
        Ok(RawFrame::new(pixels, bit_depth, is_bayered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_samples_checks_length() {
        assert!(RawFrame::from_samples(2, 2, vec![0; 4], 16, false).is_some());
        assert!(RawFrame::from_samples(2, 2, vec![0; 3], 16, false).is_none());
    }

    #[test]
    fn white_level_follows_bit_depth() {
        let frame = RawFrame::from_samples(1, 1, vec![0], 12, false).unwrap();
        assert_eq!(frame.white_level(), 4095.0);
        let frame = RawFrame::from_samples(1, 1, vec![0], 40, false).unwrap();
        assert_eq!(frame.bit_depth(), 16);
    }

    #[test]
    fn file_factory_loads_sixteen_bit_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let buffer: MosaicBuffer = ImageBuffer::from_fn(8, 4, |x, y| Luma([(x * 1000 + y) as u16]));
        buffer.save(&path).unwrap();

        let frame = FileImageDataFactory
            .load(&path, 16, false, RawConverter::Internal)
            .unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 4));
        assert_eq!(frame.pixels().get_pixel(3, 2).0[0], 3002);
    }

    #[test]
    fn file_factory_reports_missing_file() {
        let err = FileImageDataFactory
            .load(Path::new("/nonexistent/frame.tif"), 16, false, RawConverter::Internal)
            .unwrap_err();
        assert!(matches!(err, LightframeError::ImageLoad(_)));
    }

    #[test]
    fn external_converter_is_rejected() {
        let err = FileImageDataFactory
            .load(Path::new("frame.cr2"), 14, true, RawConverter::External)
            .unwrap_err();
        assert!(matches!(err, LightframeError::UnsupportedConverter(_)));
    }
}
