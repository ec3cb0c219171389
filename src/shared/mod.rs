//! Shared state and messaging between the detection loop and its front end

pub mod messages;
pub mod state;

pub use messages::DetectorEvent;
pub use state::{DetectorStatus, LoopPhase, LoopState};
