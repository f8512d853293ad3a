// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Linear (pre-stretch) frame data and bilinear demosaicing.
//
// Samples are normalised to 0.0-1.0 against the sensor's white level and
// kept as planar f32 so the stretch can work per channel without another
// conversion.

use lightframe_core::error::{LightframeError, Result};
use lightframe_core::types::BayerPattern;
use tracing::{debug, instrument};

use crate::raw::RawFrame;

/// Normalised planar image: one plane for mono, three (R, G, B) for colour.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFrame {
    width: u32,
    height: u32,
    planes: Vec<Vec<f32>>,
}

impl LinearFrame {
    /// Build from planes. Every plane must hold `width * height` samples and
    /// there must be one or three of them.
    pub fn from_planes(width: u32, height: u32, planes: Vec<Vec<f32>>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if !matches!(planes.len(), 1 | 3) {
            return Err(LightframeError::Debayer(format!(
                "expected 1 or 3 planes, got {}",
                planes.len()
            )));
        }
        if planes.iter().any(|plane| plane.len() != expected) {
            return Err(LightframeError::Debayer(format!(
                "plane size does not match {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            planes,
        })
    }

    /// Normalise a raw mosaic without demosaicing.
    pub fn mono(raw: &RawFrame) -> Self {
        let white = raw.white_level();
        let plane = raw
            .pixels()
            .as_raw()
            .iter()
            .map(|&sample| (sample as f32 / white).min(1.0))
            .collect();
        Self {
            width: raw.width(),
            height: raw.height(),
            planes: vec![plane],
        }
    }

    /// Bilinear demosaic: every output channel at a pixel is the mean of the
    /// samples of that colour in the surrounding 3x3 window (the pixel itself
    /// included when it carries that colour).
    #[instrument(skip(raw), fields(width = raw.width(), height = raw.height()))]
    pub fn debayer(raw: &RawFrame, pattern: BayerPattern) -> Result<Self> {
        let (width, height) = (raw.width(), raw.height());
        if width < 2 || height < 2 {
            return Err(LightframeError::Debayer(format!(
                "mosaic too small to demosaic: {width}x{height}"
            )));
        }

        let mono = Self::mono(raw);
        let mosaic = &mono.planes[0];
        let len = width as usize * height as usize;
        let mut planes = vec![vec![0.0f32; len]; 3];

        for y in 0..height {
            for x in 0..width {
                let mut sums = [0.0f32; 3];
                let mut counts = [0u32; 3];
                for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                        let channel = pattern.channel_at(nx, ny);
                        sums[channel] += mosaic[(ny * width + nx) as usize];
                        counts[channel] += 1;
                    }
                }

                let index = (y * width + x) as usize;
                let own = pattern.channel_at(x, y);
                for (channel, plane) in planes.iter_mut().enumerate() {
                    plane[index] = if channel == own {
                        mosaic[index]
                    } else if counts[channel] > 0 {
                        sums[channel] / counts[channel] as f32
                    } else {
                        0.0
                    };
                }
            }
        }

        debug!(?pattern, "Demosaiced frame");
        Ok(Self {
            width,
            height,
            planes,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_color(&self) -> bool {
        self.planes.len() == 3
    }

    pub fn planes(&self) -> &[Vec<f32>] {
        &self.planes
    }
}
