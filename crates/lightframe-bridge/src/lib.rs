// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lightframe-bridge: Interfaces to the systems around the pipeline.
//
// The acquisition application produces capture events and a mail sender
// consumes notifications. Neither is part of Lightframe, so both are traits
// here with small file- and log-based implementations for the CLI and tests.

pub mod directory;
pub mod sidecar;
pub mod stub;
pub mod traits;

pub use directory::DirectoryNotifier;
pub use sidecar::SidecarCaptureSource;
pub use stub::LogNotifier;
pub use traits::{CaptureSource, Notification, Notifier};
