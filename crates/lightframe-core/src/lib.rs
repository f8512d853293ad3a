// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lightframe: Core types, configuration, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use config::PluginConfig;
pub use error::LightframeError;
pub use types::*;
pub use value::{Record, StructuredValue};
