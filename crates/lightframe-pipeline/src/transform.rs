// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame transform pipeline: capture event in, cached artifact out.
//
// Events are handled fire-and-forget: `on_image_saved` spawns the work and
// returns at once, so two captures in quick succession may be processed
// concurrently and the cache keeps whichever finishes last.

use std::sync::Arc;

use lightframe_core::PluginConfig;
use lightframe_core::error::{LightframeError, Result};
use lightframe_core::types::{Artifact, ArtifactId, ImageSavedEvent};
use lightframe_image::{ImageDataFactory, RenderSettings, render_frame};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::cache::ImageCache;

/// Producer side of the cache.
#[derive(Clone)]
pub struct FramePipeline {
    cache: Arc<ImageCache>,
    config: PluginConfig,
    factory: Arc<dyn ImageDataFactory>,
}

impl FramePipeline {
    pub fn new(
        cache: Arc<ImageCache>,
        config: &PluginConfig,
        factory: Arc<dyn ImageDataFactory>,
    ) -> Self {
        Self {
            cache,
            config: config.normalized(),
            factory,
        }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Handle an "image saved" event without waiting for it.
    ///
    /// Must be called from within a Tokio runtime. Failures are logged and
    /// leave the cache untouched; the returned handle may be dropped.
    pub fn on_image_saved(&self, event: ImageSavedEvent) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            let path = event.path.clone();
            if let Err(e) = pipeline.process(event).await {
                error!(path = %path.display(), error = %e, "frame transform failed, cache unchanged");
            }
        })
    }

    /// Load, render, and cache one capture.
    ///
    /// Decoding and rendering run on the blocking pool. The cache is only
    /// touched once the encoded bytes exist.
    #[instrument(skip(self, event), fields(path = %event.path.display()))]
    pub async fn process(&self, event: ImageSavedEvent) -> Result<ArtifactId> {
        let pattern = event.bayer_pattern();
        let bit_depth = event.bit_depth();
        let converter = self.config.raw_converter;
        let settings = RenderSettings::from(&self.config);
        debug!(?pattern, bit_depth, ?converter, "transform started");

        let factory = Arc::clone(&self.factory);
        let path = event.path.clone();
        let encoded = tokio::task::spawn_blocking(move || {
            let raw = factory.load(&path, bit_depth, pattern.is_some(), converter)?;
            render_frame(&raw, pattern, &settings)
        })
        .await
        .map_err(|e| LightframeError::Stretch(format!("render task did not complete: {e}")))??;

        let artifact = Artifact::new(encoded.bytes, encoded.format, event);
        let id = artifact.id();
        let bytes = artifact.len();
        self.cache.replace(artifact);

        info!(artifact = %id, bytes, "Frame transformed");
        Ok(id)
    }
}

impl std::fmt::Debug for FramePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};
    use lightframe_core::types::RawConverter;
    use lightframe_core::{BayerPattern, OutputFormat, StructuredValue};
    use lightframe_image::{FileImageDataFactory, RawFrame};
    use serde_json::json;
    use std::path::Path;
    use std::sync::Mutex;

    /// Serves a synthetic frame and records what it was asked for.
    #[derive(Default)]
    struct SyntheticFactory {
        requests: Mutex<Vec<(u8, bool, RawConverter)>>,
    }

    impl ImageDataFactory for SyntheticFactory {
        fn load(
            &self,
            _path: &Path,
            bit_depth: u8,
            is_bayered: bool,
            converter: RawConverter,
        ) -> Result<RawFrame> {
            self.requests
                .lock()
                .unwrap()
                .push((bit_depth, is_bayered, converter));
            let samples = (0..40 * 30).map(|i| (i % 97) as u16 * 40).collect();
            Ok(RawFrame::from_samples(40, 30, samples, bit_depth, is_bayered).unwrap())
        }
    }

    fn event(path: &str, metadata: serde_json::Value) -> ImageSavedEvent {
        ImageSavedEvent::new(path, StructuredValue::from(metadata))
    }

    fn light_metadata() -> serde_json::Value {
        json!({
            "Image": { "ImageType": "LIGHT" },
            "Target": { "Name": "M31" },
            "Camera": { "SensorType": "Color", "BayerPattern": "RGGB", "BitDepth": 12 }
        })
    }

    #[tokio::test]
    async fn process_caches_encoded_artifact() {
        let cache = Arc::new(ImageCache::new());
        let factory = Arc::new(SyntheticFactory::default());
        let pipeline = FramePipeline::new(Arc::clone(&cache), &PluginConfig::default(), factory.clone());

        let id = pipeline
            .process(event("/captures/m31_001.fits", light_metadata()))
            .await
            .unwrap();

        let current = cache.current();
        assert_eq!(current.id(), id);
        assert_eq!(current.content_type(), "image/jpeg");
        assert_eq!(current.extension(), ".jpg");
        assert_eq!(&current.bytes()[..2], &[0xFF, 0xD8]);
        assert_eq!(cache.total_count(), 1);
        assert_eq!(
            factory.requests.lock().unwrap().as_slice(),
            &[(12, true, RawConverter::Internal)]
        );
        assert_eq!(
            current.metadata().path(&["Camera", "BayerPattern"]).and_then(StructuredValue::as_str),
            Some("RGGB")
        );
    }

    #[tokio::test]
    async fn png_and_resize_follow_config() {
        let cache = Arc::new(ImageCache::new());
        let config = PluginConfig {
            image_format: OutputFormat::Png,
            resize_percent: 50,
            ..PluginConfig::default()
        };
        let pipeline = FramePipeline::new(
            Arc::clone(&cache),
            &config,
            Arc::new(SyntheticFactory::default()),
        );
        pipeline.process(event("a.fits", light_metadata())).await.unwrap();

        let current = cache.current();
        assert_eq!(current.content_type(), "image/png");
        let decoded = image::load_from_memory(current.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 15));
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[tokio::test]
    async fn mono_sensor_is_not_bayered() {
        let cache = Arc::new(ImageCache::new());
        let factory = Arc::new(SyntheticFactory::default());
        let pipeline = FramePipeline::new(Arc::clone(&cache), &PluginConfig::default(), factory.clone());
        let metadata = json!({ "Camera": { "SensorType": "Monochrome" } });
        pipeline.process(event("mono.fits", metadata)).await.unwrap();

        assert_eq!(
            factory.requests.lock().unwrap().as_slice(),
            &[(16, false, RawConverter::Internal)]
        );
        assert_eq!(BayerPattern::parse("Monochrome"), None);
    }

    #[tokio::test]
    async fn failed_transform_leaves_cache_untouched() {
        let cache = Arc::new(ImageCache::new());
        let pipeline = FramePipeline::new(
            Arc::clone(&cache),
            &PluginConfig::default(),
            Arc::new(SyntheticFactory::default()),
        );
        pipeline.process(event("good.fits", light_metadata())).await.unwrap();
        let before = cache.current();

        let failing = FramePipeline::new(
            Arc::clone(&cache),
            &PluginConfig::default(),
            Arc::new(FileImageDataFactory),
        );
        let err = failing
            .process(event("/nonexistent/bad.fits", light_metadata()))
            .await
            .unwrap_err();
        assert!(matches!(err, LightframeError::ImageLoad(_)));

        assert_eq!(cache.current().id(), before.id());
        assert_eq!(cache.total_count(), 1);
    }

    #[tokio::test]
    async fn on_image_saved_runs_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        ImageBuffer::<Luma<u16>, Vec<u16>>::from_fn(16, 16, |x, y| Luma([(x * 300 + y * 20) as u16]))
            .save(&path)
            .unwrap();

        let cache = Arc::new(ImageCache::new());
        let pipeline = FramePipeline::new(
            Arc::clone(&cache),
            &PluginConfig::default(),
            Arc::new(FileImageDataFactory),
        );
        let handle = pipeline.on_image_saved(ImageSavedEvent::new(&path, json!({}).into()));
        handle.await.unwrap();

        assert_eq!(cache.current().source_path(), Some(path.as_path()));
        // Metadata without category labels is cached but not tallied.
        assert_eq!(cache.total_count(), 0);
    }

    #[tokio::test]
    async fn on_image_saved_swallows_failures() {
        let cache = Arc::new(ImageCache::new());
        let config = PluginConfig {
            raw_converter: RawConverter::External,
            ..PluginConfig::default()
        };
        let pipeline = FramePipeline::new(Arc::clone(&cache), &config, Arc::new(FileImageDataFactory));
        pipeline
            .on_image_saved(event("a.cr2", light_metadata()))
            .await
            .unwrap();
        assert!(cache.current().is_empty());
    }
}
