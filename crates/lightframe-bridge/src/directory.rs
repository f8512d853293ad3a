// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notifier that drops each message into a directory: the attachment under its
// own name and the body next to it as `<name>.txt`.

use std::path::{Path, PathBuf};

use lightframe_core::error::{LightframeError, Result};
use tracing::{info, instrument};

use crate::traits::{Notification, Notifier};

/// Writes notifications to `dir`.
#[derive(Debug, Clone)]
pub struct DirectoryNotifier {
    dir: PathBuf,
}

impl DirectoryNotifier {
    /// Create the notifier, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            LightframeError::Bridge(format!("cannot create {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Notifier for DirectoryNotifier {
    #[instrument(skip_all, fields(dir = %self.dir.display(), subject = %notification.subject))]
    fn send(&self, notification: &Notification) -> Result<()> {
        let Some(attachment) = &notification.attachment else {
            info!("notification has no attachment, nothing written");
            return Ok(());
        };

        // Attachment names come from capture files; keep only the final component.
        let file_name = Path::new(&attachment.file_name)
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| {
                LightframeError::Bridge(format!("unusable attachment name {:?}", attachment.file_name))
            })?;

        let image_path = self.dir.join(&file_name);
        std::fs::write(&image_path, &attachment.bytes)?;
        let body_path = image_path.with_extension("txt");
        std::fs::write(&body_path, format!("{}\n\n{}", notification.subject, notification.body))?;

        info!(path = %image_path.display(), bytes = attachment.bytes.len(), "attachment written");
        Ok(())
    }
}
