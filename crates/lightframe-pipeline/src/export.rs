// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export pipeline: consumer side of the cache.
//
// A notifier fires independently of the frame transform, usually while the
// transform for the same capture is still running. `wait_for_fresh` bridges
// that gap by watching the cache until its contents change or a timeout
// passes; `snapshot_and_reduce` then copies the buffer out and shrinks it for
// transport.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lightframe_core::PluginConfig;
use lightframe_core::error::{LightframeError, Result};
use lightframe_core::types::Attachment;
use lightframe_image::reduce_for_attachment;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::cache::ImageCache;

/// Name used when the cached artifact has no source path.
pub const DEFAULT_ATTACHMENT_NAME: &str = "image.jpg";
const ATTACHMENT_EXTENSION: &str = "jpg";
const ATTACHMENT_MIME: &str = "image/jpeg";

/// Outcome of [`ExportPipeline::wait_for_fresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The cache changed while waiting.
    Fresh,
    /// The timeout passed first; the cached artifact may be the previous one.
    Stale,
}

/// Byte length and source path of a cached artifact; a change in either
/// means a new capture landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    len: usize,
    source_path: Option<PathBuf>,
}

/// Firing side of a cancellation pair. Dropping it also cancels.
#[derive(Debug)]
pub struct CancelHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl CancelHandle {
    pub fn cancel(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Waiting side of a cancellation pair.
#[derive(Debug)]
pub struct CancelSignal {
    rx: Option<oneshot::Receiver<()>>,
    fired: bool,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self {
            rx: None,
            fired: false,
        }
    }

    /// Completes once the paired handle is fired or dropped.
    pub async fn cancelled(&mut self) {
        if self.fired {
            return;
        }
        match self.rx.as_mut() {
            Some(rx) => {
                let _ = rx.await;
                self.fired = true;
                self.rx = None;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Non-blocking check.
    pub fn is_cancelled(&mut self) -> bool {
        if !self.fired {
            if let Some(rx) = self.rx.as_mut() {
                if !matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Empty)) {
                    self.fired = true;
                    self.rx = None;
                }
            }
        }
        self.fired
    }
}

/// Create a linked cancel handle and signal.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = oneshot::channel();
    (
        CancelHandle { tx: Some(tx) },
        CancelSignal {
            rx: Some(rx),
            fired: false,
        },
    )
}

/// Consumer of the cache that produces attachments.
#[derive(Debug, Clone)]
pub struct ExportPipeline {
    cache: Arc<ImageCache>,
    timeout: Duration,
    poll_interval: Duration,
    scale: u32,
    quality: u8,
}

impl ExportPipeline {
    pub fn new(cache: Arc<ImageCache>, config: &PluginConfig) -> Self {
        let config = config.normalized();
        Self {
            cache,
            timeout: config.freshness_timeout(),
            poll_interval: config.poll_interval(),
            scale: config.attachment_scale,
            quality: config.attachment_quality,
        }
    }

    /// Identity of the artifact cached right now.
    pub fn baseline(&self) -> Baseline {
        let current = self.cache.current();
        Baseline {
            len: current.len(),
            source_path: current.source_path().map(Path::to_path_buf),
        }
    }

    /// Wait until the cached artifact differs from the one visible now.
    ///
    /// "Differs" means a different byte length or a different source path.
    /// The cache is re-read every poll interval and on every replace. A
    /// timeout is not an error: the caller proceeds with whatever is cached.
    pub async fn wait_for_fresh(&self, cancel: &mut CancelSignal) -> Result<Freshness> {
        self.wait_for_change(self.baseline(), cancel).await
    }

    /// Like [`wait_for_fresh`](Self::wait_for_fresh), against a baseline taken
    /// earlier, e.g. just before firing the capture event.
    #[instrument(skip_all, fields(timeout_ms = self.timeout.as_millis() as u64, baseline_len = baseline.len))]
    pub async fn wait_for_change(
        &self,
        baseline: Baseline,
        cancel: &mut CancelSignal,
    ) -> Result<Freshness> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let notified = self.cache.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.baseline() != baseline {
                debug!("fresh artifact observed");
                return Ok(Freshness::Fresh);
            }

            if Instant::now() >= deadline {
                warn!("no fresh artifact before timeout, using cached one");
                return Ok(Freshness::Stale);
            }
            let next_poll = (Instant::now() + self.poll_interval).min(deadline);

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("wait for fresh artifact cancelled");
                    return Err(LightframeError::Cancelled);
                }
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(next_poll) => {}
            }
        }
    }

    /// Reduced copy of the current artifact, or `None` if the cache is empty
    /// or the reduction fails (logged).
    #[instrument(skip(self), fields(scale = self.scale, quality = self.quality))]
    pub fn snapshot_and_reduce(&self) -> Option<Attachment> {
        let copy = self.cache.copy_bytes();
        if copy.bytes.is_empty() {
            debug!("cache is empty, no attachment");
            return None;
        }

        let reduced = match reduce_for_attachment(&copy.bytes, self.scale, self.quality) {
            Ok(reduced) => reduced,
            Err(e) => {
                warn!(error = %e, "attachment reduction failed, sending without attachment");
                return None;
            }
        };

        let file_name = attachment_name(copy.source_path.as_deref());
        info!(
            file_name = %file_name,
            width = reduced.width,
            height = reduced.height,
            bytes = reduced.bytes.len(),
            "Attachment prepared"
        );
        Some(Attachment {
            file_name,
            mime_type: ATTACHMENT_MIME.to_owned(),
            bytes: reduced.bytes,
        })
    }

    /// Wait for a fresh artifact, then reduce it on the blocking pool.
    ///
    /// Only cancellation is returned as an error.
    pub async fn prepare(&self, cancel: &mut CancelSignal) -> Result<Option<Attachment>> {
        self.prepare_since(self.baseline(), cancel).await
    }

    /// [`prepare`](Self::prepare) against an earlier baseline.
    pub async fn prepare_since(
        &self,
        baseline: Baseline,
        cancel: &mut CancelSignal,
    ) -> Result<Option<Attachment>> {
        self.wait_for_change(baseline, cancel).await?;

        let exporter = self.clone();
        match tokio::task::spawn_blocking(move || exporter.snapshot_and_reduce()).await {
            Ok(attachment) => Ok(attachment),
            Err(e) => {
                warn!(error = %e, "attachment task did not complete");
                Ok(None)
            }
        }
    }
}

/// `<source stem>.jpg`, or the default name when there is no usable stem.
fn attachment_name(source: Option<&Path>) -> String {
    source
        .and_then(Path::file_stem)
        .map(|stem| format!("{}.{ATTACHMENT_EXTENSION}", stem.to_string_lossy()))
        .unwrap_or_else(|| DEFAULT_ATTACHMENT_NAME.to_owned())
}
