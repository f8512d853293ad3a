// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plugin configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{OutputFormat, RawConverter};

/// Persistent plugin settings.
///
/// Every field has a default, so a partial `config.json` only needs to name
/// the options it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Encoding of the cached artifact. Unknown values fall back to JPEG.
    pub image_format: OutputFormat,
    /// JPEG quality for the cached artifact (0-100).
    pub jpeg_quality: u8,
    /// Output scale of the cached artifact in percent. Values >= 100 leave
    /// the image at its native size.
    pub resize_percent: u32,
    /// Integer factor by which attachment dimensions are divided.
    pub attachment_scale: u32,
    /// JPEG quality for the reduced attachment (0-100).
    pub attachment_quality: u8,
    /// Reconstruct colour from Bayer-patterned sensors.
    pub debayer_image: bool,
    /// Stretch each colour channel independently.
    pub unlinked_stretch: bool,
    /// Target background level of the auto-stretch (0-1).
    pub stretch_factor: f64,
    /// Shadows clipping point in units of normalised MAD (usually negative).
    pub black_clipping: f64,
    /// Which converter the image-data factory uses for raw files.
    pub raw_converter: RawConverter,
    /// How long a consumer waits for a fresh artifact before proceeding.
    pub freshness_timeout_ms: u64,
    /// How often a waiting consumer re-reads the cache.
    pub poll_interval_ms: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            image_format: OutputFormat::Jpeg,
            jpeg_quality: 90,
            resize_percent: 100,
            attachment_scale: 8,
            attachment_quality: 75,
            debayer_image: true,
            unlinked_stretch: false,
            stretch_factor: 0.2,
            black_clipping: -2.8,
            raw_converter: RawConverter::Internal,
            freshness_timeout_ms: 5_000,
            poll_interval_ms: 20,
        }
    }
}

impl PluginConfig {
    /// Return a copy with every option clamped into the range the encoders
    /// and the export pipeline accept.
    pub fn normalized(&self) -> Self {
        let stretch_factor = if self.stretch_factor.is_finite() {
            self.stretch_factor.clamp(0.0, 1.0)
        } else {
            Self::default().stretch_factor
        };
        let black_clipping = if self.black_clipping.is_finite() {
            self.black_clipping
        } else {
            Self::default().black_clipping
        };

        Self {
            jpeg_quality: self.jpeg_quality.clamp(1, 100),
            attachment_quality: self.attachment_quality.clamp(1, 100),
            resize_percent: self.resize_percent.max(1),
            attachment_scale: self.attachment_scale.max(1),
            poll_interval_ms: self.poll_interval_ms.max(1),
            stretch_factor,
            black_clipping,
            ..self.clone()
        }
    }

    /// Freshness timeout as a `Duration`.
    pub fn freshness_timeout(&self) -> Duration {
        Duration::from_millis(self.freshness_timeout_ms)
    }

    /// Poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
