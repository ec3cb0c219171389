//! OCR (Optical Character Recognition) engine interface
//!
//! The detection loop treats the engine as a black box: it is configured once,
//! asked to read whole frames and torn down explicitly on shutdown.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::DetectionCandidate;
use crate::capture::frame::Frame;
use crate::error::DetectorError;

/// Upper and lower case ASCII letters
pub const ALPHABET_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// How the engine should segment a page before reading it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegmentationMode {
    /// Fully automatic page segmentation
    Auto,
    /// A single uniform block of text
    SingleBlock,
    /// A single text line
    SingleLine,
    /// A single word
    SingleWord,
    /// A single character
    SingleChar,
    /// As much text as possible in no particular order
    #[default]
    SparseText,
}

impl PageSegmentationMode {
    /// Numeric mode understood by tesseract's `--psm`
    pub fn as_psm(&self) -> u8 {
        match self {
            Self::Auto => 3,
            Self::SingleBlock => 6,
            Self::SingleLine => 7,
            Self::SingleWord => 8,
            Self::SingleChar => 10,
            Self::SparseText => 11,
        }
    }
}

/// Settings applied to the engine at initialization time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Characters the engine may emit
    pub character_whitelist: String,
    /// Page segmentation mode
    pub page_segmentation_mode: PageSegmentationMode,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            character_whitelist: ALPHABET_WHITELIST.to_string(),
            page_segmentation_mode: PageSegmentationMode::SparseText,
        }
    }
}

/// Common interface for text-recognition backends
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Prepare the engine; called once before the first recognition
    async fn initialize(&self, config: &RecognitionConfig) -> Result<(), DetectorError>;

    /// Read every text region in the frame
    async fn recognize(&self, frame: &Frame) -> Result<Vec<DetectionCandidate>, DetectorError>;

    /// Release background resources held by the engine
    async fn terminate(&self) -> Result<(), DetectorError> {
        Ok(())
    }
}
