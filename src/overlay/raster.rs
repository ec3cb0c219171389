//! Raster surface backed by an RGBA image buffer
//!
//! Fills are alpha-blended so the translucent box fill keeps the outline
//! visible. Without a font file, labels get their background strip but no
//! glyphs and widths are estimated from the character count.

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size, Blend};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Surface, SurfaceRect};

/// Average glyph advance relative to the font size, used without a font
const FALLBACK_ADVANCE: f32 = 0.6;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

pub struct RasterSurface {
    canvas: RgbaImage,
    font: Option<FontVec>,
    snapshot_dir: Option<PathBuf>,
    snapshots_written: u64,
}

impl RasterSurface {
    /// Create a transparent surface of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, TRANSPARENT),
            font: None,
            snapshot_dir: None,
            snapshots_written: 0,
        }
    }

    /// Load the font used for label text
    pub fn with_font_file(mut self, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file: {:?}", path))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow!("Invalid font file {:?}: {}", path, e))?;

        info!("Loaded overlay font from {:?}", path);
        self.font = Some(font);
        Ok(self)
    }

    /// Write a numbered PNG into `dir` every time the surface is presented
    pub fn with_snapshot_dir(mut self, dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create snapshot directory: {:?}", dir))?;
        self.snapshot_dir = Some(dir.to_path_buf());
        Ok(self)
    }

    /// The pixels currently on the surface
    #[cfg(test)]
    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    #[cfg(test)]
    pub fn snapshots_written(&self) -> u64 {
        self.snapshots_written
    }

    /// Run a drawing call through a blending canvas
    fn blend_with(&mut self, draw: impl FnOnce(&mut Blend<RgbaImage>)) {
        let canvas = std::mem::replace(&mut self.canvas, RgbaImage::new(0, 0));
        let mut blend = Blend(canvas);
        draw(&mut blend);
        self.canvas = blend.0;
    }
}

fn to_rect(rect: SurfaceRect) -> Option<Rect> {
    if rect.is_empty() {
        None
    } else {
        Some(Rect::at(rect.x, rect.y).of_size(rect.width, rect.height))
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        debug!("Resizing overlay surface to {}x{}", width, height);
        self.canvas = RgbaImage::from_pixel(width, height, TRANSPARENT);
    }

    fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn fill_rect(&mut self, rect: SurfaceRect, color: Rgba<u8>) {
        if let Some(rect) = to_rect(rect) {
            self.blend_with(|canvas| draw_filled_rect_mut(canvas, rect, color));
        }
    }

    fn stroke_rect(&mut self, rect: SurfaceRect, color: Rgba<u8>, line_width: u32) {
        if rect.is_empty() {
            return;
        }
        // Each extra pixel of width grows the outline outwards
        let rects: Vec<Rect> = (0..line_width.max(1))
            .map(|i| {
                Rect::at(rect.x - i as i32, rect.y - i as i32)
                    .of_size(rect.width + 2 * i, rect.height + 2 * i)
            })
            .collect();
        self.blend_with(|canvas| {
            for r in rects {
                draw_hollow_rect_mut(canvas, r, color);
            }
        });
    }

    fn measure_text(&self, text: &str, font_size: f32) -> u32 {
        match &self.font {
            Some(font) => text_size(PxScale::from(font_size), font, text).0,
            None => (text.chars().count() as f32 * font_size * FALLBACK_ADVANCE).round() as u32,
        }
    }

    fn fill_text(&mut self, text: &str, x: i32, y: i32, font_size: f32, color: Rgba<u8>) {
        let Some(font) = self.font.take() else {
            return;
        };
        self.blend_with(|canvas| {
            draw_text_mut(canvas, color, x, y, PxScale::from(font_size), &font, text)
        });
        self.font = Some(font);
    }

    fn present(&mut self) -> Result<()> {
        let Some(dir) = &self.snapshot_dir else {
            return Ok(());
        };
        let path = dir.join(format!("overlay_{:06}.png", self.snapshots_written));
        self.canvas
            .save(&path)
            .with_context(|| format!("Failed to write overlay snapshot: {:?}", path))?;
        self.snapshots_written += 1;
        debug!("Wrote overlay snapshot {:?}", path);
        Ok(())
    }
}
