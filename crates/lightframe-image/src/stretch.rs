// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Automatic screen stretch.
//
// Linear astro frames are almost entirely dark. The stretch clips the shadows
// just below the sky background and bends the midtones with a midtones
// transfer function (MTF) so the background median lands on a fixed target
// brightness. Statistics come from a 16-bit histogram so large frames need no
// sort.

use image::{DynamicImage, GrayImage, RgbImage};
use lightframe_core::PluginConfig;
use lightframe_core::error::{LightframeError, Result};
use tracing::{debug, instrument};

use crate::debayer::LinearFrame;

const HISTOGRAM_BINS: usize = 1 << 16;

/// Scales MAD to a standard-deviation estimate for normal data.
const MAD_TO_SIGMA: f64 = 1.4826;

/// Midtones transfer function.
///
/// Maps 0 to 0, 1 to 1, and `m` to 0.5. Inputs outside 0-1 are clamped to
/// the nearest end.
pub fn mtf(midtones: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    if midtones <= 0.0 {
        return 1.0;
    }
    if midtones >= 1.0 {
        return 0.0;
    }
    ((midtones - 1.0) * x) / ((2.0 * midtones - 1.0) * x - midtones)
}

/// Target brightness and shadows clipping for the auto-stretch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchParams {
    /// Brightness the background median is mapped to (0-1).
    pub target: f64,
    /// Shadows clipping point in normalised-MAD units from the median.
    pub black_clipping: f64,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self::from(&PluginConfig::default())
    }
}

impl From<&PluginConfig> for StretchParams {
    fn from(config: &PluginConfig) -> Self {
        Self {
            target: config.stretch_factor,
            black_clipping: config.black_clipping,
        }
    }
}

/// Robust location and spread of one channel (both on the 0-1 scale).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub median: f64,
    /// Median absolute deviation from `median`.
    pub mad: f64,
}

impl ChannelStats {
    /// Histogram median and MAD of `samples`. Empty input yields zeros.
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a f32>) -> Self {
        let mut histogram = vec![0u64; HISTOGRAM_BINS];
        for &sample in samples {
            histogram[bin_of(sample)] += 1;
        }
        Self::from_histogram(&histogram)
    }

    fn from_histogram(histogram: &[u64]) -> Self {
        let Some(median_bin) = median_bin(histogram) else {
            return Self {
                median: 0.0,
                mad: 0.0,
            };
        };

        // Deviations from the median bin, accumulated straight from the
        // sample histogram.
        let mut deviations = vec![0u64; HISTOGRAM_BINS];
        for (bin, &count) in histogram.iter().enumerate() {
            deviations[bin.abs_diff(median_bin)] += count;
        }
        let mad_bin = median_bin_or_zero(&deviations);

        let scale = (HISTOGRAM_BINS - 1) as f64;
        Self {
            median: median_bin as f64 / scale,
            mad: mad_bin as f64 / scale,
        }
    }
}

fn bin_of(sample: f32) -> usize {
    let clamped = if sample.is_finite() {
        sample.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (clamped * (HISTOGRAM_BINS - 1) as f32).round() as usize
}

/// Lower median bin; `None` for an empty histogram.
fn median_bin(histogram: &[u64]) -> Option<usize> {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return None;
    }
    let half = total.div_ceil(2);
    let mut cumulative = 0u64;
    histogram.iter().position(|&count| {
        cumulative += count;
        cumulative >= half
    })
}

fn median_bin_or_zero(histogram: &[u64]) -> usize {
    median_bin(histogram).unwrap_or(0)
}

/// Shadows clip and midtones balance derived from one set of statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchCurve {
    pub shadows: f64,
    pub midtones: f64,
}

impl StretchCurve {
    pub fn from_stats(stats: ChannelStats, params: &StretchParams) -> Self {
        let shadows =
            (stats.median + params.black_clipping * MAD_TO_SIGMA * stats.mad).clamp(0.0, 1.0);
        let midtones = mtf(params.target, rescale(stats.median, shadows));
        Self { shadows, midtones }
    }

    /// Stretched value of a linear sample.
    pub fn apply(&self, x: f64) -> f64 {
        mtf(self.midtones, rescale(x, self.shadows))
    }

    fn apply_u8(&self, x: f32) -> u8 {
        (self.apply(f64::from(x)) * 255.0).round() as u8
    }
}

/// Map `x` from `[shadows, 1]` onto `[0, 1]`.
fn rescale(x: f64, shadows: f64) -> f64 {
    let range = (1.0 - shadows).max(f64::EPSILON);
    ((x - shadows) / range).clamp(0.0, 1.0)
}

/// Stretch a linear frame to 8 bits per channel.
///
/// Colour frames share one curve computed from all channels pooled together
/// unless `unlinked` is set, in which case every channel gets its own.
/// Mono frames yield `Luma8`, colour frames `Rgb8`.
#[instrument(skip(frame, params), fields(width = frame.width(), height = frame.height(), color = frame.is_color()))]
pub fn stretch(frame: &LinearFrame, params: &StretchParams, unlinked: bool) -> Result<DynamicImage> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(LightframeError::Stretch("frame has no pixels".into()));
    }
    if !params.target.is_finite() || !params.black_clipping.is_finite() {
        return Err(LightframeError::Stretch(format!(
            "non-finite stretch parameters: {params:?}"
        )));
    }

    let planes = frame.planes();
    let curves: Vec<StretchCurve> = if unlinked && frame.is_color() {
        planes
            .iter()
            .map(|plane| StretchCurve::from_stats(ChannelStats::from_samples(plane), params))
            .collect()
    } else {
        let stats = ChannelStats::from_samples(planes.iter().flatten());
        vec![StretchCurve::from_stats(stats, params); planes.len()]
    };
    debug!(?curves, "Stretch curves computed");

    let (width, height) = (frame.width(), frame.height());
    let image = if frame.is_color() {
        let mut rgb = RgbImage::new(width, height);
        for (index, pixel) in rgb.pixels_mut().enumerate() {
            for (channel, value) in pixel.0.iter_mut().enumerate() {
                *value = curves[channel].apply_u8(planes[channel][index]);
            }
        }
        DynamicImage::ImageRgb8(rgb)
    } else {
        let curve = curves[0];
        let mut gray = GrayImage::new(width, height);
        for (pixel, &sample) in gray.pixels_mut().zip(&planes[0]) {
            pixel.0[0] = curve.apply_u8(sample);
        }
        DynamicImage::ImageLuma8(gray)
    };
    Ok(image)
}
