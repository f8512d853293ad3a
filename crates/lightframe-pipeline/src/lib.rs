// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lightframe-pipeline: Capture-to-consumption plumbing.
//
// `FramePipeline` turns capture events into cached artifacts without blocking
// the event source, `ImageCache` holds the latest artifact and the category
// tallies, and `ExportPipeline` lets a notifier wait for a fresh artifact and
// take a reduced copy of it.

pub mod cache;
pub mod export;
pub mod transform;

pub use cache::{BufferCopy, ImageCache, SubscriptionId};
pub use export::{Baseline, CancelHandle, CancelSignal, ExportPipeline, Freshness, cancellation};
pub use transform::FramePipeline;
