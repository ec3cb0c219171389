//! Detection Loop Controller
//!
//! Runs sample -> motion gate -> recognize -> filter -> render cycles on a tokio
//! task and owns all loop state. Only one recognition call is ever in flight:
//! a cycle that finds the loop busy reschedules itself without sampling, and a
//! result that arrives after `stop()` is dropped instead of drawn.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};

use crate::capture::FrameSource;
use crate::config::{AppConfig, ScheduleConfig};
use crate::error::DetectorError;
use crate::overlay::{OverlayRenderer, Surface};
use crate::shared::{DetectorEvent, DetectorStatus, LoopPhase, LoopState};
use crate::vision::{
    filter_candidates, has_motion, motion_score, DetectionCandidate, FilterConfig, MotionConfig,
    RecognitionEngine,
};

/// Events buffered for the front end before new ones are dropped
const EVENT_CAPACITY: usize = 256;

/// Parameters that can change while the loop runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorConfig {
    pub motion: MotionConfig,
    pub filter: FilterConfig,
    pub schedule: ScheduleConfig,
}

impl DetectorConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            motion: config.motion.clone(),
            filter: config.recognition.filter_config(),
            schedule: config.schedule.clone(),
        }
    }
}

/// What a single cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Loop is not running (or this cycle belongs to an earlier run)
    Stopped,
    /// A recognition call is still in flight; nothing was sampled
    Busy,
    /// No frame could be grabbed
    SourceUnavailable,
    /// Frame matched the previous one closely enough to skip recognition
    NoMotion,
    /// Recognition ran and these candidates were drawn
    Rendered(Vec<DetectionCandidate>),
    /// Recognition failed; the overlay was cleared
    RecognitionFailed,
    /// Loop stopped while recognition was in flight; the result was dropped
    Discarded,
}

impl CycleOutcome {
    /// Delay before the next cycle, or `None` when the run is over
    pub fn next_delay(&self, schedule: &ScheduleConfig) -> Option<Duration> {
        match self {
            Self::Stopped | Self::Discarded => None,
            Self::Busy => Some(schedule.busy_retry()),
            Self::SourceUnavailable | Self::NoMotion => Some(schedule.idle_delay()),
            Self::Rendered(_) | Self::RecognitionFailed => Some(schedule.cycle_delay()),
        }
    }
}

/// Background task driving one run
struct Driver {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    state: Mutex<LoopState>,
    config: RwLock<DetectorConfig>,
    source: Mutex<Box<dyn FrameSource>>,
    engine: Arc<dyn RecognitionEngine>,
    surface: Mutex<Box<dyn Surface>>,
    renderer: OverlayRenderer,
    events_tx: Sender<DetectorEvent>,
    events_rx: Receiver<DetectorEvent>,
    driver: Mutex<Option<Driver>>,
}

/// Clears the busy flag when a recognition step ends, however it ends
struct BusyGuard<'a> {
    state: &'a Mutex<LoopState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().busy = false;
    }
}

/// Motion-gated letter detector
#[derive(Clone)]
pub struct Detector {
    inner: Arc<Inner>,
}

impl Detector {
    /// Initialize the recognition engine and build an idle detector
    ///
    /// An engine that fails to come up is fatal: no detector is returned, so
    /// there is nothing to start.
    pub async fn initialize(
        config: &AppConfig,
        source: Box<dyn FrameSource>,
        engine: Arc<dyn RecognitionEngine>,
        surface: Box<dyn Surface>,
    ) -> Result<Self, DetectorError> {
        info!("Initializing {} recognition engine", engine.name());

        engine
            .initialize(&config.recognition.engine_config())
            .await
            .map_err(|e| {
                error!("Recognition engine failed to start: {}", e);
                match e {
                    DetectorError::EngineInit { .. } => e,
                    other => DetectorError::engine_init(other.to_string()),
                }
            })?;

        let (events_tx, events_rx) = bounded(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(LoopState::default()),
                config: RwLock::new(DetectorConfig::from_app(config)),
                source: Mutex::new(source),
                engine,
                surface: Mutex::new(surface),
                renderer: OverlayRenderer::new(config.overlay.clone()),
                events_tx,
                events_rx,
                driver: Mutex::new(None),
            }),
        })
    }

    /// Start detecting; must be called from within a tokio runtime
    ///
    /// Returns false if the loop was already running.
    pub fn start(&self) -> bool {
        let Some(generation) = self.inner.begin_run() else {
            debug!("Detection already running");
            return false;
        };

        let token = CancellationToken::new();
        let handle = tokio::spawn(drive(self.inner.clone(), generation, token.clone()));

        if let Some(previous) = self.inner.driver.lock().replace(Driver { token, handle }) {
            previous.token.cancel();
        }

        info!("Detection started (run {})", generation);
        true
    }

    /// Stop detecting and clear the overlay
    ///
    /// A recognition call already in flight is left to finish; its result is
    /// discarded. Returns false if the loop was not running.
    pub fn stop(&self) -> bool {
        {
            let mut state = self.inner.state.lock();
            if !state.is_running() {
                return false;
            }
            state.phase = LoopPhase::Stopped;
        }

        if let Some(driver) = self.inner.driver.lock().as_ref() {
            driver.token.cancel();
        }

        {
            let mut surface = self.inner.surface.lock();
            surface.clear();
            if let Err(e) = surface.present() {
                warn!("Failed to present cleared overlay: {:#}", e);
            }
        }

        self.inner.emit(DetectorEvent::Stopped);
        self.inner.set_status(DetectorStatus::Stopped);
        info!("Detection stopped");
        true
    }

    /// Flip between running and stopped; returns whether it is now running
    pub fn toggle(&self) -> bool {
        if self.is_running() {
            self.stop();
            false
        } else {
            self.start();
            true
        }
    }

    /// Run one cycle now, as the scheduler would
    pub async fn tick(&self) -> CycleOutcome {
        let generation = self.inner.state.lock().generation;
        self.inner.run_cycle(generation).await
    }

    /// Replace motion, filter and schedule parameters; applies from the next cycle
    pub fn configure(&self, config: DetectorConfig) {
        info!(
            "Detector reconfigured: stride={}, min_confidence={}, idle={}ms, cycle={}ms",
            config.motion.sample_stride,
            config.filter.min_confidence,
            config.schedule.idle_delay_ms,
            config.schedule.cycle_delay_ms
        );
        *self.inner.config.write() = config;
    }

    pub fn config(&self) -> DetectorConfig {
        self.inner.config.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().is_running()
    }

    pub fn phase(&self) -> LoopPhase {
        self.inner.state.lock().phase
    }

    pub fn status(&self) -> DetectorStatus {
        self.inner.state.lock().status.clone()
    }

    /// Receiver for lifecycle and detection events
    ///
    /// Events are dropped while the buffer is full, so drain it regularly.
    pub fn events(&self) -> Receiver<DetectorEvent> {
        self.inner.events_rx.clone()
    }

    /// Stop, wait for the driver task to wind down and release the engine
    pub async fn shutdown(&self) {
        self.stop();

        let driver = self.inner.driver.lock().take();
        if let Some(driver) = driver {
            driver.token.cancel();
            if let Err(e) = driver.handle.await {
                warn!("Detection driver ended abnormally: {}", e);
            }
        }

        if let Err(e) = self.inner.engine.terminate().await {
            warn!("Failed to release recognition engine: {}", e);
        }
        info!("Detector shut down");
    }
}

impl Inner {
    /// Move to Running and return the new run's generation
    fn begin_run(&self) -> Option<u64> {
        let mut state = self.state.lock();
        if state.is_running() {
            return None;
        }
        state.phase = LoopPhase::Running;
        state.previous_frame = None;
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        self.emit(DetectorEvent::Started);
        self.set_status(DetectorStatus::Detecting);
        Some(generation)
    }

    fn emit(&self, event: DetectorEvent) {
        if let Err(TrySendError::Full(event)) = self.events_tx.try_send(event) {
            debug!("Event buffer full, dropping {:?}", event);
        }
    }

    fn set_status(&self, status: DetectorStatus) {
        {
            let mut state = self.state.lock();
            if state.status == status {
                return;
            }
            state.status = status.clone();
        }
        debug!("Status: {}", status);
        self.emit(DetectorEvent::Status(status));
    }

    async fn run_cycle(&self, generation: u64) -> CycleOutcome {
        {
            let state = self.state.lock();
            if !state.accepts(generation) {
                return CycleOutcome::Stopped;
            }
            if state.busy {
                return CycleOutcome::Busy;
            }
        }

        let grabbed = self.source.lock().grab();
        let frame = match grabbed {
            Ok(frame) => {
                debug!(
                    "Sampled {}x{} frame, {:?} old",
                    frame.width(),
                    frame.height(),
                    frame.timestamp().elapsed()
                );
                Arc::new(frame)
            }
            Err(e) => {
                debug!("Skipping cycle: {}", e);
                self.set_status(DetectorStatus::SourceUnavailable);
                return CycleOutcome::SourceUnavailable;
            }
        };

        let config = self.config.read().clone();

        // Compare and replace the previous frame under one lock
        let guard = {
            let mut state = self.state.lock();
            if !state.accepts(generation) {
                return CycleOutcome::Stopped;
            }
            if state.busy {
                return CycleOutcome::Busy;
            }
            let previous = state.previous_frame.as_deref();
            if tracing::enabled!(Level::DEBUG) {
                if let Some(previous) = previous {
                    let score = motion_score(&frame, previous, &config.motion);
                    debug!(
                        "Motion: {} of {} sampled pixels changed ({:.3})",
                        score.changed,
                        score.sampled,
                        score.changed_fraction()
                    );
                }
            }
            let moved = has_motion(&frame, previous, &config.motion);
            state.previous_frame = Some(frame.clone());
            if !moved {
                return CycleOutcome::NoMotion;
            }
            state.busy = true;
            BusyGuard { state: &self.state }
        };

        let recognized = match self.engine.recognize(&frame).await {
            Ok(words) => {
                let total = words.len();
                let kept = filter_candidates(words, &config.filter);
                debug!("Recognition returned {} words, {} letters kept", total, kept.len());
                Ok(kept)
            }
            Err(e) => {
                warn!("{}", e);
                Err(e)
            }
        };

        // Status and events are published before the surface is released so a
        // concurrent stop() always lands after them
        let outcome = {
            let mut surface = self.surface.lock();
            if !self.state.lock().accepts(generation) {
                debug!("Discarding recognition result from stopped run {}", generation);
                return CycleOutcome::Discarded;
            }

            let (width, height) = frame.dimensions();
            if surface.size() != (width, height) {
                surface.resize(width, height);
            }

            let shown = recognized.as_deref().unwrap_or(&[]);
            self.renderer.render(&mut **surface, shown);
            if let Err(e) = surface.present() {
                warn!("Failed to present overlay: {:#}", e);
            }

            self.publish(recognized)
        };
        drop(guard);
        outcome
    }

    /// Turn a finished recognition step into status, events and an outcome
    fn publish(&self, recognized: Result<Vec<DetectionCandidate>, DetectorError>) -> CycleOutcome {
        match recognized {
            Ok(candidates) if candidates.is_empty() => {
                self.set_status(DetectorStatus::NothingFound);
                CycleOutcome::Rendered(candidates)
            }
            Ok(candidates) => {
                let letters: Vec<char> = candidates.iter().filter_map(|c| c.letter()).collect();
                info!("Detected letters: {:?}", letters);
                self.emit(DetectorEvent::Detected(candidates.clone()));
                self.set_status(DetectorStatus::Detected(letters));
                CycleOutcome::Rendered(candidates)
            }
            Err(e) => {
                let message = match e {
                    DetectorError::EngineRecognition { message } => message,
                    other => other.to_string(),
                };
                self.set_status(DetectorStatus::RecognitionFailed(message));
                CycleOutcome::RecognitionFailed
            }
        }
    }
}

/// Schedule cycles for one run until it is cancelled or stops itself
async fn drive(inner: Arc<Inner>, generation: u64, token: CancellationToken) {
    let mut delay = Duration::ZERO;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let outcome = inner.run_cycle(generation).await;
        let schedule = inner.config.read().schedule.clone();
        match outcome.next_delay(&schedule) {
            Some(next) => delay = next,
            None => break,
        }
    }
    debug!("Driver for run {} exited", generation);
}
