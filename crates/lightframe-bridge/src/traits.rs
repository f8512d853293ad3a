// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator traits.

use std::future::Future;

use lightframe_core::error::Result;
use lightframe_core::types::{Attachment, ImageSavedEvent};

/// Source of "image saved" events, one per physical capture.
pub trait CaptureSource {
    /// Next capture, or `None` once the source is exhausted.
    fn next_event(&mut self) -> impl Future<Output = Result<Option<ImageSavedEvent>>> + Send;
}

/// An outbound message ready for transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }

    /// Builder-style: attach a reduced image, if one was produced.
    pub fn with_attachment(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = attachment;
        self
    }
}

/// Delivers notifications (mail, chat, ...).
pub trait Notifier {
    /// Deliver one notification. Delivery failures are `LightframeError::Bridge`.
    fn send(&self, notification: &Notification) -> Result<()>;
}
