//! Loop state owned by the detector

use std::fmt;
use std::sync::Arc;

use crate::capture::frame::Frame;

/// Lifecycle phase of the detection loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPhase {
    /// Never started
    #[default]
    Idle,
    /// Cycles are being scheduled
    Running,
    /// Stopped by the user; behaves like Idle and can be restarted
    Stopped,
}

/// Short human-readable status shown next to the start/stop control
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DetectorStatus {
    #[default]
    Ready,
    Detecting,
    Detected(Vec<char>),
    NothingFound,
    SourceUnavailable,
    RecognitionFailed(String),
    Stopped,
}

impl fmt::Display for DetectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Detecting => write!(f, "Detecting..."),
            Self::Detected(letters) => {
                let letters: Vec<String> = letters.iter().map(|c| c.to_string()).collect();
                write!(f, "Detected: {}", letters.join(", "))
            }
            Self::NothingFound => write!(f, "No letters found"),
            Self::SourceUnavailable => write!(f, "Waiting for video"),
            Self::RecognitionFailed(message) => write!(f, "Recognition failed: {}", message),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Mutable state of the detection loop
#[derive(Debug, Default)]
pub struct LoopState {
    pub phase: LoopPhase,
    /// True while a recognize/filter/render step is in flight
    pub busy: bool,
    /// Frame the next motion check compares against
    pub previous_frame: Option<Arc<Frame>>,
    /// Bumped on every start; cycles from an older run must not do work
    pub generation: u64,
    pub status: DetectorStatus,
}

impl LoopState {
    pub fn is_running(&self) -> bool {
        self.phase == LoopPhase::Running
    }

    /// Whether a cycle scheduled for `generation` may still do work
    pub fn accepts(&self, generation: u64) -> bool {
        self.is_running() && self.generation == generation
    }
}
