// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Lightframe capture pipeline.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LightframeError, Result};
use crate::value::StructuredValue;

/// Well-known locations inside capture metadata.
pub mod metadata_paths {
    pub const IMAGE_TYPE: &[&str] = &["Image", "ImageType"];
    pub const EXPOSURE_TIME: &[&str] = &["Image", "ExposureTime"];
    pub const RECORDED_RMS: &[&str] = &["Image", "RecordedRMS"];
    pub const TARGET_NAME: &[&str] = &["Target", "Name"];
    pub const SENSOR_TYPE: &[&str] = &["Camera", "SensorType"];
    pub const BAYER_PATTERN: &[&str] = &["Camera", "BayerPattern"];
    pub const BIT_DEPTH: &[&str] = &["Camera", "BitDepth"];
}

/// Bit depth assumed when the camera does not report one.
pub const DEFAULT_BIT_DEPTH: u8 = 16;

/// Unique identifier for a cached artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encoding of the cached artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputFormat {
    /// Lossy, quality-configurable.
    Jpeg,
    /// Lossless.
    Png,
}

impl OutputFormat {
    /// Parse a configuration value. Anything unrecognised is JPEG.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            _ => Self::Jpeg,
        }
    }

    /// MIME type of the encoded bytes.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
        }
    }
}

impl From<String> for OutputFormat {
    fn from(value: String) -> Self {
        Self::from_setting(&value)
    }
}

impl From<OutputFormat> for String {
    fn from(value: OutputFormat) -> Self {
        match value {
            OutputFormat::Jpeg => "jpeg".into(),
            OutputFormat::Png => "png".into(),
        }
    }
}

/// Converter the image-data factory uses for raw camera files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RawConverter {
    /// Built-in decoder.
    Internal,
    /// An external converter program supplied by the host application.
    External,
}

impl RawConverter {
    /// Parse a configuration value, ignoring case. Anything unrecognised is
    /// the built-in decoder.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "external" => Self::External,
            _ => Self::Internal,
        }
    }
}

impl From<String> for RawConverter {
    fn from(value: String) -> Self {
        Self::from_setting(&value)
    }
}

impl From<RawConverter> for String {
    fn from(value: RawConverter) -> Self {
        match value {
            RawConverter::Internal => "internal".into(),
            RawConverter::External => "external".into(),
        }
    }
}

/// Colour filter array layout of a one-shot-colour sensor, named by its
/// top-left 2x2 cell read row by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BayerPattern {
    Rggb,
    Bggr,
    Grbg,
    Gbrg,
}

impl BayerPattern {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "RGGB" => Some(Self::Rggb),
            "BGGR" => Some(Self::Bggr),
            "GRBG" => Some(Self::Grbg),
            "GBRG" => Some(Self::Gbrg),
            _ => None,
        }
    }

    /// Colour channel (0 = R, 1 = G, 2 = B) sampled at pixel `(x, y)`.
    pub fn channel_at(&self, x: u32, y: u32) -> usize {
        let cell = (((y & 1) << 1) | (x & 1)) as usize;
        let layout: [usize; 4] = match self {
            Self::Rggb => [0, 1, 1, 2],
            Self::Bggr => [2, 1, 1, 0],
            Self::Grbg => [1, 0, 2, 1],
            Self::Gbrg => [1, 2, 0, 1],
        };
        layout[cell]
    }
}

/// "Image saved" notification emitted by the capture source.
#[derive(Debug, Clone)]
pub struct ImageSavedEvent {
    /// Where the raw frame was written.
    pub path: PathBuf,
    /// Camera / target / exposure / guiding fields.
    pub metadata: StructuredValue,
    /// Pixel statistics, if the host computed them.
    pub statistics: StructuredValue,
    /// Star analysis from whichever detector extension is active, if any.
    pub analysis: StructuredValue,
}

impl ImageSavedEvent {
    pub fn new(path: impl Into<PathBuf>, metadata: StructuredValue) -> Self {
        Self {
            path: path.into(),
            metadata,
            statistics: StructuredValue::Absent,
            analysis: StructuredValue::Absent,
        }
    }

    /// Bayer pattern of the sensor, or `None` for monochrome sensors.
    ///
    /// `Camera.SensorType` may name the pattern directly; a generic `Color`
    /// sensor type defers to `Camera.BayerPattern`.
    pub fn bayer_pattern(&self) -> Option<BayerPattern> {
        let sensor = self
            .metadata
            .path(metadata_paths::SENSOR_TYPE)
            .and_then(StructuredValue::as_str)?;
        if let Some(pattern) = BayerPattern::parse(sensor) {
            return Some(pattern);
        }
        if sensor.eq_ignore_ascii_case("color") {
            return self
                .metadata
                .path(metadata_paths::BAYER_PATTERN)
                .and_then(StructuredValue::as_str)
                .and_then(BayerPattern::parse);
        }
        None
    }

    /// Sensor bit depth, defaulting to 16.
    pub fn bit_depth(&self) -> u8 {
        self.metadata
            .path(metadata_paths::BIT_DEPTH)
            .and_then(StructuredValue::as_f64)
            .filter(|depth| (1.0..=16.0).contains(depth))
            .map_or(DEFAULT_BIT_DEPTH, |depth| depth as u8)
    }
}

/// One fully processed capture.
///
/// Immutable once built: the cache replaces whole artifacts and never
/// mutates one in place.
#[derive(Debug, Clone)]
pub struct Artifact {
    id: ArtifactId,
    bytes: Vec<u8>,
    content_type: String,
    extension: String,
    source_path: Option<PathBuf>,
    metadata: StructuredValue,
    statistics: StructuredValue,
    analysis: StructuredValue,
    created_at: DateTime<Utc>,
}

impl Artifact {
    /// Build an artifact from encoded bytes and the capture event that
    /// produced them.
    pub fn new(bytes: Vec<u8>, format: OutputFormat, event: ImageSavedEvent) -> Self {
        Self {
            id: ArtifactId::new(),
            bytes,
            content_type: format.mime_type().to_owned(),
            extension: format.extension().to_owned(),
            source_path: Some(event.path),
            metadata: event.metadata,
            statistics: event.statistics,
            analysis: event.analysis,
            created_at: Utc::now(),
        }
    }

    /// Placeholder held by the cache before the first capture completes.
    pub fn empty() -> Self {
        Self {
            id: ArtifactId::new(),
            bytes: Vec::new(),
            content_type: String::new(),
            extension: String::new(),
            source_path: None,
            metadata: StructuredValue::Absent,
            statistics: StructuredValue::Absent,
            analysis: StructuredValue::Absent,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn metadata(&self) -> &StructuredValue {
        &self.metadata
    }

    pub fn statistics(&self) -> &StructuredValue {
        &self.statistics
    }

    pub fn analysis(&self) -> &StructuredValue {
        &self.analysis
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Default for Artifact {
    fn default() -> Self {
        Self::empty()
    }
}

/// Composite tally key: (image type, target name).
///
/// Both labels are compared exactly, so `Light` and `light` are different
/// categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryKey {
    image_type: String,
    target_name: String,
}

impl CategoryKey {
    /// Build a key; fails if either label is missing.
    pub fn new(image_type: Option<&str>, target_name: Option<&str>) -> Result<Self> {
        let image_type = image_type
            .ok_or_else(|| LightframeError::InvalidCategory("image type is missing".into()))?;
        let target_name = target_name
            .ok_or_else(|| LightframeError::InvalidCategory("target name is missing".into()))?;
        Ok(Self {
            image_type: image_type.to_owned(),
            target_name: target_name.to_owned(),
        })
    }

    /// Derive the key from capture metadata (`Image.ImageType`, `Target.Name`).
    pub fn from_metadata(metadata: &StructuredValue) -> Result<Self> {
        if metadata.as_record().is_none() {
            return Err(LightframeError::MalformedMetadata(
                "metadata is not an object".into(),
            ));
        }
        let label = |path: &[&str]| metadata.path(path).and_then(StructuredValue::as_str);
        Self::new(
            label(metadata_paths::IMAGE_TYPE),
            label(metadata_paths::TARGET_NAME),
        )
    }

    pub fn image_type(&self) -> &str {
        &self.image_type
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }
}

impl std::fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.image_type, self.target_name)
    }
}

/// A reduced copy of the current image, ready for outbound transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;

    fn metadata(sensor: &str, pattern: Option<&str>) -> StructuredValue {
        let mut camera = Record::new().with("SensorType", sensor);
        if let Some(pattern) = pattern {
            camera = camera.with("BayerPattern", pattern);
        }
        Record::new().with("Camera", camera).into()
    }

    #[test]
    fn sensor_type_naming_a_pattern_is_bayered() {
        let event = ImageSavedEvent::new("a.fits", metadata("RGGB", None));
        assert_eq!(event.bayer_pattern(), Some(BayerPattern::Rggb));
    }

    #[test]
    fn color_sensor_uses_bayer_pattern_field() {
        let event = ImageSavedEvent::new("a.fits", metadata("Color", Some("gbrg")));
        assert_eq!(event.bayer_pattern(), Some(BayerPattern::Gbrg));
    }

    #[test]
    fn monochrome_and_missing_are_not_bayered() {
        let event = ImageSavedEvent::new("a.fits", metadata("Monochrome", Some("RGGB")));
        assert_eq!(event.bayer_pattern(), None);
        let event = ImageSavedEvent::new("a.fits", StructuredValue::Absent);
        assert_eq!(event.bayer_pattern(), None);
    }

    #[test]
    fn bit_depth_defaults_to_sixteen() {
        let event = ImageSavedEvent::new("a.fits", StructuredValue::Absent);
        assert_eq!(event.bit_depth(), 16);
        let meta = Record::new().with("Camera", Record::new().with("BitDepth", 12.0));
        let event = ImageSavedEvent::new("a.fits", meta.into());
        assert_eq!(event.bit_depth(), 12);
    }

    #[test]
    fn rggb_channel_layout() {
        let p = BayerPattern::Rggb;
        assert_eq!(p.channel_at(0, 0), 0);
        assert_eq!(p.channel_at(1, 0), 1);
        assert_eq!(p.channel_at(0, 1), 1);
        assert_eq!(p.channel_at(1, 1), 2);
        assert_eq!(p.channel_at(2, 2), 0);
    }

    #[test]
    fn category_key_rejects_missing_labels() {
        assert!(CategoryKey::new(None, Some("M31")).is_err());
        assert!(CategoryKey::new(Some("LIGHT"), None).is_err());
        assert!(CategoryKey::new(Some("LIGHT"), Some("")).is_ok());
    }

    #[test]
    fn category_key_is_case_sensitive() {
        let a = CategoryKey::new(Some("Light"), Some("M31")).unwrap();
        let b = CategoryKey::new(Some("light"), Some("M31")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn category_key_from_metadata() {
        let meta: StructuredValue = Record::new()
            .with("Image", Record::new().with("ImageType", "LIGHT"))
            .with("Target", Record::new().with("Name", "M42"))
            .into();
        let key = CategoryKey::from_metadata(&meta).unwrap();
        assert_eq!(key.image_type(), "LIGHT");
        assert_eq!(key.target_name(), "M42");

        assert!(matches!(
            CategoryKey::from_metadata(&StructuredValue::Absent),
            Err(LightframeError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn artifact_takes_tagging_from_format() {
        let event = ImageSavedEvent::new("/data/m31_001.fits", StructuredValue::Absent);
        let artifact = Artifact::new(vec![1, 2, 3], OutputFormat::Png, event);
        assert_eq!(artifact.content_type(), "image/png");
        assert_eq!(artifact.extension(), ".png");
        assert_eq!(artifact.len(), 3);
        assert_eq!(artifact.source_path(), Some(Path::new("/data/m31_001.fits")));
        assert!(Artifact::empty().is_empty());
    }
}
