// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Logging notifier for runs without a mail transport.

use lightframe_core::error::Result;

use crate::traits::{Notification, Notifier};

/// Writes each notification to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        match &notification.attachment {
            Some(attachment) => tracing::info!(
                subject = %notification.subject,
                attachment = %attachment.file_name,
                attachment_bytes = attachment.bytes.len(),
                "notification (log only)"
            ),
            None => tracing::info!(
                subject = %notification.subject,
                "notification (log only, no attachment)"
            ),
        }
        for line in notification.body.lines() {
            tracing::info!("  {line}");
        }
        Ok(())
    }
}
