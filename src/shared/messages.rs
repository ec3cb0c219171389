//! Events published by the detector to whoever drives the UI

use crate::shared::state::DetectorStatus;
use crate::vision::DetectionCandidate;

/// Messages sent from the detection loop
#[derive(Debug, Clone)]
pub enum DetectorEvent {
    /// Detection loop has started
    Started,
    /// Detection loop has stopped
    Stopped,
    /// A cycle finished rendering these letters
    Detected(Vec<DetectionCandidate>),
    /// Status string changed
    Status(DetectorStatus),
}
