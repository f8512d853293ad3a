// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Lightframe.

use thiserror::Error;

/// Top-level error type for all Lightframe operations.
#[derive(Debug, Error)]
pub enum LightframeError {
    // -- Frame transform errors --
    #[error("failed to load raw image: {0}")]
    ImageLoad(String),

    #[error("debayer failed: {0}")]
    Debayer(String),

    #[error("stretch failed: {0}")]
    Stretch(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("raw converter not available: {0}")]
    UnsupportedConverter(String),

    // -- Metadata / bookkeeping --
    #[error("malformed capture metadata: {0}")]
    MalformedMetadata(String),

    #[error("invalid category key: {0}")]
    InvalidCategory(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Consumer side --
    #[error("operation cancelled")]
    Cancelled,

    #[error("collaborator error: {0}")]
    Bridge(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LightframeError {
    /// Whether this error is the caller-facing cancellation signal rather than
    /// a degradation that was already logged.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LightframeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cancelled_is_cancellation() {
        assert!(LightframeError::Cancelled.is_cancellation());
        assert!(!LightframeError::Encode("jpeg".into()).is_cancellation());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LightframeError = io.into();
        assert!(err.to_string().contains("gone"));
    }
}
