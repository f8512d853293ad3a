// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture source backed by image files on disk.
//
// Each image may have a JSON sidecar next to it (`m31_001.tif` ->
// `m31_001.tif.json`) holding what the acquisition application would have
// attached to the event:
//
//     { "metadata": {...}, "statistics": {...}, "analysis": {...} }
//
// Every key is optional.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use lightframe_core::error::Result;
use lightframe_core::types::ImageSavedEvent;
use lightframe_core::value::StructuredValue;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::traits::CaptureSource;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Sidecar {
    metadata: serde_json::Value,
    statistics: serde_json::Value,
    analysis: serde_json::Value,
}

/// Emits one event per queued image path, in order.
#[derive(Debug, Default)]
pub struct SidecarCaptureSource {
    pending: VecDeque<PathBuf>,
}

impl SidecarCaptureSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            pending: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

/// `<image>.json` next to `image`.
pub fn sidecar_path(image: &Path) -> PathBuf {
    let mut name = OsString::from(image.as_os_str());
    name.push(".json");
    PathBuf::from(name)
}

async fn read_sidecar(image: &Path) -> Sidecar {
    let path = sidecar_path(image);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no sidecar, capture has no metadata");
            return Sidecar::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "sidecar unreadable, ignoring");
            return Sidecar::default();
        }
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "sidecar is not valid JSON, ignoring");
        Sidecar::default()
    })
}

impl CaptureSource for SidecarCaptureSource {
    async fn next_event(&mut self) -> Result<Option<ImageSavedEvent>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let sidecar = read_sidecar(&path).await;
        let mut event = ImageSavedEvent::new(path, StructuredValue::from(sidecar.metadata));
        event.statistics = sidecar.statistics.into();
        event.analysis = sidecar.analysis.into();
        Ok(Some(event))
    }
}
