// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame processor: turns a stretched frame into the bytes that get cached.
// Scaling and encoding both go through the `image` crate.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use lightframe_core::PluginConfig;
use lightframe_core::error::{LightframeError, Result};
use lightframe_core::types::{BayerPattern, OutputFormat};
use tracing::{debug, info, instrument};

use crate::debayer::LinearFrame;
use crate::raw::RawFrame;
use crate::stretch::{self, StretchParams};

/// Display-side processing of a single in-memory image.
///
/// Each transformation consumes `self` and returns the transformed processor,
/// so steps chain:
///
/// ```ignore
/// let jpeg = FrameProcessor::stretched(&linear, &params, false)?
///     .scale_percent(50)
///     .encode(OutputFormat::Jpeg, 90)?;
/// ```
pub struct FrameProcessor {
    image: DynamicImage,
}

impl FrameProcessor {
    /// Stretch a linear frame into an 8-bit display image.
    pub fn stretched(frame: &LinearFrame, params: &StretchParams, unlinked: bool) -> Result<Self> {
        let image = stretch::stretch(frame, params, unlinked)?;
        Ok(Self { image })
    }

    /// Decode an already-encoded image (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data).map_err(|err| {
            LightframeError::ImageLoad(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Scale both dimensions to `percent` of their current size (rounded,
    /// never below one pixel). 100 and above leave the image untouched.
    #[instrument(skip(self), fields(percent))]
    pub fn scale_percent(self, percent: u32) -> Self {
        if percent >= 100 {
            return self;
        }
        let scaled_dim = |dim: u32| {
            ((f64::from(dim) * f64::from(percent) / 100.0).round() as u32).max(1)
        };
        let (width, height) = (scaled_dim(self.width()), scaled_dim(self.height()));
        self.scale_to(width, height)
    }

    /// Divide both dimensions by `factor` (integer division, never below one
    /// pixel).
    pub fn shrink_by(self, factor: u32) -> Self {
        let factor = factor.max(1);
        if factor == 1 {
            return self;
        }
        let width = (self.width() / factor).max(1);
        let height = (self.height() / factor).max(1);
        self.scale_to(width, height)
    }

    /// Resample to exactly `width` x `height`.
    ///
    /// The triangle filter widens with the reduction factor, so every source
    /// pixel contributes and isolated stars survive a large shrink.
    pub fn scale_to(self, width: u32, height: u32) -> Self {
        if (width, height) == (self.width(), self.height()) {
            return self;
        }
        info!(
            from_w = self.width(),
            from_h = self.height(),
            width,
            height,
            "Scaling image"
        );
        let image = match self.image {
            gray @ DynamicImage::ImageLuma8(_) => {
                gray.resize_exact(width, height, FilterType::Triangle)
            }
            other => {
                DynamicImage::ImageRgb8(other.to_rgb8()).resize_exact(width, height, FilterType::Triangle)
            }
        };
        Self { image }
    }

    /// Collapse to a single 8-bit luminance channel.
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Encode in the given output format. `quality` only applies to JPEG.
    pub fn encode(&self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Jpeg => self.to_jpeg_bytes(quality),
            OutputFormat::Png => self.to_png_bytes(),
        }
    }

    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| LightframeError::Encode(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// JPEG at `quality` (1-100). Grayscale images stay single-channel.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        let written = match &self.image {
            DynamicImage::ImageLuma8(gray) => gray.write_with_encoder(encoder),
            other => other.to_rgb8().write_with_encoder(encoder),
        };
        written.map_err(|err| LightframeError::Encode(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

/// Everything the transform needs from the plugin configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub debayer: bool,
    pub unlinked_stretch: bool,
    pub stretch: StretchParams,
    pub resize_percent: u32,
    pub format: OutputFormat,
    pub jpeg_quality: u8,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from(&PluginConfig::default())
    }
}

impl From<&PluginConfig> for RenderSettings {
    fn from(config: &PluginConfig) -> Self {
        let config = config.normalized();
        Self {
            debayer: config.debayer_image,
            unlinked_stretch: config.unlinked_stretch,
            stretch: StretchParams::from(&config),
            resize_percent: config.resize_percent,
            format: config.image_format,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

/// Encoded output of [`render_frame`].
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// Full display render of a raw capture: optional debayer, auto-stretch,
/// proportional scale, encode.
///
/// Debayering happens only when enabled, the frame is flagged as bayered, and
/// a pattern is known. Otherwise the mosaic is stretched as mono.
#[instrument(skip_all, fields(width = raw.width(), height = raw.height(), format = ?settings.format))]
pub fn render_frame(
    raw: &RawFrame,
    pattern: Option<BayerPattern>,
    settings: &RenderSettings,
) -> Result<EncodedFrame> {
    let linear = match pattern {
        Some(pattern) if settings.debayer && raw.is_bayered() => {
            LinearFrame::debayer(raw, pattern)?
        }
        _ => LinearFrame::mono(raw),
    };

    let processor = FrameProcessor::stretched(&linear, &settings.stretch, settings.unlinked_stretch)?
        .scale_percent(settings.resize_percent);
    let bytes = processor.encode(settings.format, settings.jpeg_quality)?;

    info!(
        width = processor.width(),
        height = processor.height(),
        bytes = bytes.len(),
        "Frame rendered"
    );
    Ok(EncodedFrame {
        bytes,
        format: settings.format,
        width: processor.width(),
        height: processor.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_raw(width: u32, height: u32, bayered: bool) -> RawFrame {
        let samples = (0..width * height)
            .map(|i| ((i * 37) % 4096) as u16 * 8)
            .collect();
        RawFrame::from_samples(width, height, samples, 16, bayered).unwrap()
    }

    #[test]
    fn scale_percent_rounds_dimensions() {
        let processor = FrameProcessor::from_dynamic(DynamicImage::new_luma8(101, 33));
        let scaled = processor.scale_percent(50);
        assert_eq!((scaled.width(), scaled.height()), (51, 17));
        assert!(scaled.as_dynamic().as_luma8().is_some());
    }

    #[test]
    fn scale_percent_never_reaches_zero() {
        let processor = FrameProcessor::from_dynamic(DynamicImage::new_rgb8(10, 10));
        let scaled = processor.scale_percent(1);
        assert_eq!((scaled.width(), scaled.height()), (1, 1));
    }

    #[test]
    fn scale_percent_at_or_above_hundred_is_identity() {
        let processor = FrameProcessor::from_dynamic(DynamicImage::new_rgb8(20, 10));
        let scaled = processor.scale_percent(150);
        assert_eq!((scaled.width(), scaled.height()), (20, 10));
    }

    #[test]
    fn shrink_by_divides_dimensions() {
        let processor = FrameProcessor::from_dynamic(DynamicImage::new_rgb8(800, 600));
        let shrunk = processor.shrink_by(8);
        assert_eq!((shrunk.width(), shrunk.height()), (100, 75));
    }

    #[test]
    fn jpeg_and_png_signatures() {
        let processor = FrameProcessor::from_dynamic(DynamicImage::new_luma8(16, 16));
        let jpeg = processor.encode(OutputFormat::Jpeg, 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let png = processor.encode(OutputFormat::Png, 90).unwrap();
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        let err = FrameProcessor::from_bytes(b"not an image").err().unwrap();
        assert!(matches!(err, LightframeError::ImageLoad(_)));
    }

    #[test]
    fn render_mono_frame_to_half_size_jpeg() {
        let settings = RenderSettings {
            resize_percent: 50,
            ..RenderSettings::default()
        };
        let encoded = render_frame(&gradient_raw(64, 48, false), None, &settings).unwrap();
        assert_eq!((encoded.width, encoded.height), (32, 24));
        assert_eq!(encoded.format, OutputFormat::Jpeg);

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
    }

    #[test]
    fn render_bayered_frame_produces_colour() {
        let settings = RenderSettings {
            format: OutputFormat::Png,
            ..RenderSettings::default()
        };
        let encoded =
            render_frame(&gradient_raw(32, 32, true), Some(BayerPattern::Rggb), &settings).unwrap();
        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert_eq!((decoded.width(), decoded.height()), (32, 32));
    }

    #[test]
    fn disabled_debayer_stays_mono() {
        let settings = RenderSettings {
            debayer: false,
            format: OutputFormat::Png,
            ..RenderSettings::default()
        };
        let encoded =
            render_frame(&gradient_raw(32, 32, true), Some(BayerPattern::Rggb), &settings).unwrap();
        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
    }

    #[test]
    fn settings_follow_normalised_config() {
        let config = PluginConfig {
            jpeg_quality: 0,
            resize_percent: 0,
            image_format: OutputFormat::Png,
            ..PluginConfig::default()
        };
        let settings = RenderSettings::from(&config);
        assert_eq!(settings.jpeg_quality, 1);
        assert_eq!(settings.resize_percent, 1);
        assert_eq!(settings.format, OutputFormat::Png);
    }
}
