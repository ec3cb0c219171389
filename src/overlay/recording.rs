//! Surface that records draw calls, used to assert on overlay output

use image::Rgba;
use parking_lot::Mutex;
use std::sync::Arc;

use super::{Surface, SurfaceRect};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Fill(SurfaceRect, Rgba<u8>),
    Stroke(SurfaceRect, Rgba<u8>, u32),
    Text(String, i32, i32, Rgba<u8>),
}

/// Keeps the operations visible since the last clear
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<DrawOp>,
    pub clears: usize,
    pub presents: usize,
    pub resizes: Vec<(u32, u32)>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.ops.clear();
        self.resizes.push((width, height));
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.clears += 1;
    }

    fn fill_rect(&mut self, rect: SurfaceRect, color: Rgba<u8>) {
        self.ops.push(DrawOp::Fill(rect, color));
    }

    fn stroke_rect(&mut self, rect: SurfaceRect, color: Rgba<u8>, line_width: u32) {
        self.ops.push(DrawOp::Stroke(rect, color, line_width));
    }

    fn measure_text(&self, text: &str, font_size: f32) -> u32 {
        (text.chars().count() as f32 * font_size * 0.5) as u32
    }

    fn fill_text(&mut self, text: &str, x: i32, y: i32, _font_size: f32, color: Rgba<u8>) {
        self.ops.push(DrawOp::Text(text.to_string(), x, y, color));
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.presents += 1;
        Ok(())
    }
}

/// Recording surface that a test can inspect after handing it to the detector
#[derive(Debug, Clone, Default)]
pub struct SharedRecording(pub Arc<Mutex<RecordingSurface>>);

impl SharedRecording {
    pub fn new(width: u32, height: u32) -> Self {
        Self(Arc::new(Mutex::new(RecordingSurface::new(width, height))))
    }
}

impl Surface for SharedRecording {
    fn size(&self) -> (u32, u32) {
        self.0.lock().size()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.0.lock().resize(width, height)
    }

    fn clear(&mut self) {
        self.0.lock().clear()
    }

    fn fill_rect(&mut self, rect: SurfaceRect, color: Rgba<u8>) {
        self.0.lock().fill_rect(rect, color)
    }

    fn stroke_rect(&mut self, rect: SurfaceRect, color: Rgba<u8>, line_width: u32) {
        self.0.lock().stroke_rect(rect, color, line_width)
    }

    fn measure_text(&self, text: &str, font_size: f32) -> u32 {
        self.0.lock().measure_text(text, font_size)
    }

    fn fill_text(&mut self, text: &str, x: i32, y: i32, font_size: f32, color: Rgba<u8>) {
        self.0.lock().fill_text(text, x, y, font_size, color)
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.0.lock().present()
    }
}
