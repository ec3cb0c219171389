//! Overlay Presentation Layer
//!
//! Draws detection boxes and labels onto a `Surface` sized to the video frame.
//! The renderer only talks to the `Surface` trait, so the same drawing code
//! feeds the raster backend and the test recorder.

pub mod raster;
#[cfg(test)]
pub mod recording;
pub mod widgets;

use image::Rgba;

use crate::vision::DetectionCandidate;
use widgets::OverlayStyle;

pub use raster::RasterSurface;

/// Rectangle in surface pixels; `x`/`y` may be negative for labels clipped at the top
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl SurfaceRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A 2D drawing target aligned to the video frame
pub trait Surface: Send {
    /// Current (width, height) in pixels
    fn size(&self) -> (u32, u32);

    /// Resize to match new video dimensions; discards current content
    fn resize(&mut self, width: u32, height: u32);

    /// Erase everything drawn so far
    fn clear(&mut self);

    fn fill_rect(&mut self, rect: SurfaceRect, color: Rgba<u8>);

    fn stroke_rect(&mut self, rect: SurfaceRect, color: Rgba<u8>, line_width: u32);

    /// Width in pixels `text` would occupy at `font_size`
    fn measure_text(&self, text: &str, font_size: f32) -> u32;

    /// Draw `text` with its top-left corner at (x, y)
    fn fill_text(&mut self, text: &str, x: i32, y: i32, font_size: f32, color: Rgba<u8>);

    /// Make the current content visible to whoever displays the surface
    fn present(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Draws accepted candidates as labelled boxes
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    #[cfg(test)]
    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Label text shown above a candidate
    pub fn label_for(&self, candidate: &DetectionCandidate) -> String {
        let letter = candidate
            .letter()
            .map(String::from)
            .unwrap_or_else(|| candidate.text.trim().to_uppercase());
        format!("{}{}", self.style.label_prefix, letter)
    }

    /// Replace the overlay with boxes for `candidates`, drawn in list order
    pub fn render(&self, surface: &mut dyn Surface, candidates: &[DetectionCandidate]) {
        surface.clear();
        for candidate in candidates {
            self.draw_candidate(surface, candidate);
        }
    }

    fn draw_candidate(&self, surface: &mut dyn Surface, candidate: &DetectionCandidate) {
        let style = &self.style;
        let bbox = candidate.bbox;
        let x0 = bbox.x0 as i32;
        let y0 = bbox.y0 as i32;

        let body = SurfaceRect::new(x0, y0, bbox.width(), bbox.height());
        surface.stroke_rect(body, style.stroke(), style.line_width);
        surface.fill_rect(body, style.fill());

        let label = self.label_for(candidate);
        let text_width = surface.measure_text(&label, style.font_size);
        let label_top = y0 - style.label_height as i32;
        let background = SurfaceRect::new(
            x0,
            label_top,
            text_width + style.label_padding,
            style.label_height,
        );
        surface.fill_rect(background, style.label_fill());

        // Centre the glyphs vertically in the strip
        let text_top = label_top + (style.label_height as f32 - style.font_size).max(0.0) as i32 / 2;
        surface.fill_text(
            &label,
            x0 + (style.label_padding / 2) as i32,
            text_top,
            style.font_size,
            style.label_text(),
        );
    }
}
