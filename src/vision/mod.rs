//! Vision/OCR Layer
//!
//! Decides whether a frame is worth reading, runs the recognition engine on it
//! and narrows the raw words down to single-letter candidates.

pub mod filter;
pub mod motion;
pub mod ocr;
pub mod tesseract;

use serde::Serialize;

pub use filter::{filter_candidates, FilterConfig};
pub use motion::{has_motion, motion_score, MotionConfig};
pub use ocr::RecognitionEngine;
pub use tesseract::TesseractEngine;

/// Bounding box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BoundingBox {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

/// A text fragment reported by the recognition engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionCandidate {
    /// Recognized text content
    pub text: String,
    /// Confidence score (0 - 100)
    pub confidence: f32,
    /// Where the text sits in the frame
    pub bbox: BoundingBox,
}

impl DetectionCandidate {
    pub fn new(text: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox,
        }
    }

    /// The detected letter, uppercased, when the text is a single character
    pub fn letter(&self) -> Option<char> {
        let mut chars = self.text.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c.to_ascii_uppercase()),
            _ => None,
        }
    }
}
