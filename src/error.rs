//! Error kinds surfaced by the detection loop

use thiserror::Error;

/// Errors raised by the frame source and the recognition engine.
///
/// Only `EngineInit` is fatal: the others are logged, turned into a status
/// string and the loop carries on with its next cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("recognition engine failed to initialize: {message}")]
    EngineInit { message: String },
    #[error("recognition failed: {message}")]
    EngineRecognition { message: String },
    #[error("frame source unavailable: {message}")]
    SourceUnavailable { message: String },
}

impl DetectorError {
    pub fn engine_init(message: impl Into<String>) -> Self {
        Self::EngineInit {
            message: message.into(),
        }
    }

    pub fn recognition(message: impl Into<String>) -> Self {
        Self::EngineRecognition {
            message: message.into(),
        }
    }

    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
        }
    }
}
