//! Styling for the detection overlay

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Style configuration for detection boxes and their labels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayStyle {
    /// Bounding box outline colour (RGBA)
    pub stroke_color: [u8; 4],
    /// Translucent bounding box fill (RGBA)
    pub fill_color: [u8; 4],
    /// Label background colour (RGBA)
    pub label_background: [u8; 4],
    /// Label text colour (RGBA)
    pub label_text_color: [u8; 4],
    /// Outline width in pixels
    pub line_width: u32,
    /// Label font size in pixels
    pub font_size: f32,
    /// Height of the label strip drawn above each box
    pub label_height: u32,
    /// Horizontal padding added to the measured label width
    pub label_padding: u32,
    /// Text placed before the detected letter
    pub label_prefix: String,
    /// TrueType/OpenType font used for labels
    pub font_path: Option<PathBuf>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke_color: [0, 255, 0, 255],
            fill_color: [0, 255, 0, 51],
            label_background: [0, 255, 0, 255],
            label_text_color: [0, 0, 0, 255],
            line_width: 2,
            font_size: 16.0,
            label_height: 25,
            label_padding: 10,
            label_prefix: "Alphabet detected: ".to_string(),
            font_path: None,
        }
    }
}

impl OverlayStyle {
    pub fn stroke(&self) -> Rgba<u8> {
        Rgba(self.stroke_color)
    }

    pub fn fill(&self) -> Rgba<u8> {
        Rgba(self.fill_color)
    }

    pub fn label_fill(&self) -> Rgba<u8> {
        Rgba(self.label_background)
    }

    pub fn label_text(&self) -> Rgba<u8> {
        Rgba(self.label_text_color)
    }
}
