// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: the composition root.
//
// Owns the single `ImageCache` and hands `Arc` clones of it to the frame
// transform (producer) and the export pipeline (consumer). Everything here is
// cheap to clone so it can move into spawned tasks.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lightframe_bridge::{Notification, Notifier};
use lightframe_core::error::Result;
use lightframe_core::types::{Artifact, Attachment, CategoryKey, ImageSavedEvent};
use lightframe_core::PluginConfig;
use lightframe_image::{FileImageDataFactory, ImageDataFactory};
use lightframe_metrics::{MetricReport, MetricResolver, subject_labels};
use lightframe_pipeline::{CancelHandle, CancelSignal, ExportPipeline, FramePipeline, ImageCache};
use tracing::{error, info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";
const DEFAULT_SUBJECT: &str = "Lightframe capture";

/// Shared services for one process.
#[derive(Clone)]
pub struct AppServices {
    cache: Arc<ImageCache>,
    frames: FramePipeline,
    export: ExportPipeline,
    resolver: MetricResolver,
    config: PluginConfig,
    config_path: PathBuf,
}

impl AppServices {
    /// Load the configuration (from `config_path`, or `config.json` in the
    /// data directory) and build the pipelines around a fresh cache.
    pub fn init(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| data_dir::data_dir().join(CONFIG_FILE));
        let config = load_config(&config_path);
        info!(path = %config_path.display(), "app services initialised");
        Self::with_config(config, config_path, Arc::new(FileImageDataFactory))
    }

    pub fn with_config(
        config: PluginConfig,
        config_path: PathBuf,
        factory: Arc<dyn ImageDataFactory>,
    ) -> Self {
        let config = config.normalized();
        let cache = Arc::new(ImageCache::new());
        Self {
            frames: FramePipeline::new(Arc::clone(&cache), &config, factory),
            export: ExportPipeline::new(Arc::clone(&cache), &config),
            cache,
            resolver: MetricResolver::default(),
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }

    /// Write the effective configuration to the config path.
    pub fn persist_config(&self) -> Result<()> {
        persist_config(&self.config_path, &self.config)
    }

    // -- Capture handling ---------------------------------------------------

    /// Run one capture through to a notification.
    ///
    /// Fires the capture event without waiting on it, waits for the cache to
    /// change (or the freshness timeout), then reports on whatever is cached
    /// and hands the result to `notifier`. A failed delivery is logged; only
    /// cancellation is returned.
    pub async fn handle_capture(
        &self,
        event: ImageSavedEvent,
        notifier: &dyn Notifier,
        cancel: &mut CancelSignal,
    ) -> Result<()> {
        let baseline = self.export.baseline();
        self.frames.on_image_saved(event);

        let attachment = self.export.prepare_since(baseline, cancel).await?;
        let notification = compose_notification(&self.cache.current(), &self.resolver, attachment);

        if let Err(e) = notifier.send(&notification) {
            error!(subject = %notification.subject, error = %e, "notification delivery failed");
        }
        Ok(())
    }

    /// Category tallies sorted for display.
    pub fn sorted_counters(&self) -> Vec<(CategoryKey, u64)> {
        let mut counters: Vec<_> = self.cache.counters().into_iter().collect();
        counters.sort_by(|(a, _), (b, _)| {
            (a.image_type(), a.target_name()).cmp(&(b.image_type(), b.target_name()))
        });
        counters
    }
}

/// Subject from the capture labels, body from the metric report.
fn compose_notification(
    artifact: &Artifact,
    resolver: &MetricResolver,
    attachment: Option<Attachment>,
) -> Notification {
    let subject = match subject_labels(artifact) {
        (Some(image_type), Some(target)) => format!("{image_type} / {target}"),
        (Some(label), None) | (None, Some(label)) => label.to_owned(),
        (None, None) => DEFAULT_SUBJECT.to_owned(),
    };
    let body = MetricReport::from_artifact(artifact, resolver).to_string();
    Notification::new(subject, body).with_attachment(attachment)
}

/// Fire `handle` when `interrupt` resolves.
///
/// If the interrupt source cannot be installed the handle is held forever:
/// dropping it would cancel every capture.
pub async fn cancel_on_interrupt<F>(interrupt: F, handle: CancelHandle)
where
    F: Future<Output = std::io::Result<()>>,
{
    match interrupt.await {
        Ok(()) => {
            info!("interrupt received, abandoning current capture");
            handle.cancel();
        }
        Err(e) => {
            warn!(error = %e, "interrupt handler unavailable, captures cannot be cancelled");
            let _held = handle;
            std::future::pending::<()>().await;
        }
    }
}

// -- Persistence helpers ------------------------------------------------------

fn load_config(path: &Path) -> PluginConfig {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file, using defaults");
            return PluginConfig::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
            return PluginConfig::default();
        }
    };
    match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config is not valid, using defaults");
            PluginConfig::default()
        }
    }
}

fn persist_config(path: &Path, config: &PluginConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}
