// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lightframe-image: Turns a raw sensor frame into a display-ready encoded
// image.
//
// Provides the image-data factory (raw file -> 16-bit mosaic), bilinear
// debayering, a midtones-transfer auto-stretch, proportional scaling, JPEG/PNG
// encoding, and the 8-bit reduction used for outbound attachments.

pub mod attachment;
pub mod debayer;
pub mod processor;
pub mod raw;
pub mod stretch;

// Re-export the primary structs so callers can use `lightframe_image::FrameProcessor` etc.
pub use attachment::{ReducedImage, reduce_for_attachment};
pub use debayer::LinearFrame;
pub use processor::{EncodedFrame, FrameProcessor, RenderSettings, render_frame};
pub use raw::{FileImageDataFactory, ImageDataFactory, RawFrame};
pub use stretch::{ChannelStats, StretchParams};
