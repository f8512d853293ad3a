// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Attachment reduction: a small 8-bit grayscale JPEG of the cached artifact.

use lightframe_core::error::Result;
use tracing::{info, instrument};

use crate::processor::FrameProcessor;

/// Output of [`reduce_for_attachment`].
#[derive(Debug, Clone)]
pub struct ReducedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode `encoded`, drop it to single-channel 8-bit, divide both dimensions
/// by `scale` (integer division, at least one pixel), and re-encode as JPEG at
/// `quality`.
#[instrument(skip(encoded), fields(encoded_len = encoded.len()))]
pub fn reduce_for_attachment(encoded: &[u8], scale: u32, quality: u8) -> Result<ReducedImage> {
    let processor = FrameProcessor::from_bytes(encoded)?
        .grayscale()
        .shrink_by(scale);
    let bytes = processor.to_jpeg_bytes(quality)?;

    info!(
        width = processor.width(),
        height = processor.height(),
        bytes = bytes.len(),
        "Attachment reduced"
    );
    Ok(ReducedImage {
        bytes,
        width: processor.width(),
        height: processor.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use lightframe_core::LightframeError;

    fn encoded_rgb(width: u32, height: u32) -> Vec<u8> {
        let rgb = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        FrameProcessor::from_dynamic(DynamicImage::ImageRgb8(rgb))
            .to_jpeg_bytes(90)
            .unwrap()
    }

    #[test]
    fn reduces_dimensions_and_channels() {
        let reduced = reduce_for_attachment(&encoded_rgb(800, 600), 8, 75).unwrap();
        assert_eq!((reduced.width, reduced.height), (100, 75));

        let decoded = image::load_from_memory(&reduced.bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!((decoded.width(), decoded.height()), (100, 75));
    }

    #[test]
    fn isolated_stars_survive_reduction() {
        // One bright pixel per 8x8 cell on a black sky.
        let sky = image::GrayImage::from_fn(800, 600, |x, y| {
            let star = x % 8 == 4 && y % 8 == 4;
            image::Luma([if star { 255 } else { 0 }])
        });
        let png = FrameProcessor::from_dynamic(DynamicImage::ImageLuma8(sky))
            .to_png_bytes()
            .unwrap();

        let reduced = reduce_for_attachment(&png, 8, 95).unwrap();
        let decoded = image::load_from_memory(&reduced.bytes).unwrap().to_luma8();
        let brightest = decoded.pixels().map(|p| p[0]).max().unwrap();
        assert!(brightest >= 2, "stars vanished, brightest pixel {brightest}");
    }

    #[test]
    fn tiny_images_keep_one_pixel() {
        let reduced = reduce_for_attachment(&encoded_rgb(5, 3), 8, 75).unwrap();
        assert_eq!((reduced.width, reduced.height), (1, 1));
    }

    #[test]
    fn scale_of_one_keeps_size() {
        let reduced = reduce_for_attachment(&encoded_rgb(40, 30), 1, 75).unwrap();
        assert_eq!((reduced.width, reduced.height), (40, 30));
    }

    #[test]
    fn undecodable_input_is_an_error() {
        let err = reduce_for_attachment(&[], 8, 75).unwrap_err();
        assert!(matches!(err, LightframeError::ImageLoad(_)));
    }
}
