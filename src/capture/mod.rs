//! Frame Sampling Layer
//!
//! The detection loop pulls the current picture from a `FrameSource` whenever a
//! cycle runs. Camera lifecycle and permissions stay outside this crate; the
//! bundled source plays a directory of still images back as a video.

pub mod frame;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::DetectorError;
use frame::Frame;

/// Anything that can hand over the current video frame on demand
pub trait FrameSource: Send {
    /// Grab the frame that is showing right now
    fn grab(&mut self) -> Result<Frame, DetectorError>;
}

/// File extensions recognised as still frames
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Plays a directory of images back at a fixed frame rate
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    fps: f32,
    looping: bool,
    started_at: Instant,
    /// Last decoded frame, reused while the playhead stays on it
    cached: Option<(usize, Frame)>,
}

impl ImageSequenceSource {
    /// Open a directory of frames, sorted by file name
    pub fn open(dir: &Path, fps: f32, looping: bool) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frames directory: {:?}", dir))?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_frame_file(path))
            .collect();
        frames.sort();

        info!("Loaded {} frames from {:?} at {} fps", frames.len(), dir, fps);

        Ok(Self::from_paths(frames, fps, looping))
    }

    /// Build a source from an explicit list of frame files
    pub fn from_paths(frames: Vec<PathBuf>, fps: f32, looping: bool) -> Self {
        Self {
            frames,
            fps: if fps > 0.0 { fps } else { 1.0 },
            looping,
            started_at: Instant::now(),
            cached: None,
        }
    }

    /// Number of frames in the sequence
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the frame at the current playhead, if playback is still going
    fn current_index(&self) -> Option<usize> {
        if self.frames.is_empty() {
            return None;
        }
        let elapsed = self.started_at.elapsed().as_secs_f32();
        let index = (elapsed * self.fps).floor() as usize;

        if self.looping {
            Some(index % self.frames.len())
        } else if index < self.frames.len() {
            Some(index)
        } else {
            None
        }
    }
}

impl FrameSource for ImageSequenceSource {
    fn grab(&mut self) -> Result<Frame, DetectorError> {
        let index = self.current_index().ok_or_else(|| {
            if self.is_empty() {
                DetectorError::source_unavailable("no frames available")
            } else {
                DetectorError::source_unavailable("playback finished")
            }
        })?;

        if let Some((cached_index, frame)) = &self.cached {
            if *cached_index == index {
                return Ok(frame.clone());
            }
        }

        let path = &self.frames[index];
        let frame = off_runtime(|| decode_frame(path))?;
        debug!("Decoded frame {} from {:?}", index, path);

        self.cached = Some((index, frame.clone()));
        Ok(frame)
    }
}

fn decode_frame(path: &Path) -> Result<Frame, DetectorError> {
    let image = image::open(path).map_err(|e| {
        DetectorError::source_unavailable(format!("failed to decode {:?}: {}", path, e))
    })?;
    Ok(Frame::from_image(image.to_rgba8()))
}

/// Run blocking work without stalling other tasks on a multi-threaded runtime
///
/// `block_in_place` panics on a current-thread runtime, so the work runs
/// inline there (and outside any runtime).
fn off_runtime<T>(work: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
