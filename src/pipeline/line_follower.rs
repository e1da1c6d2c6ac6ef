// src/pipeline/line_follower.rs
//
// Cycle orchestrator. Owns every piece of core state and runs one frame
// through calibration (when requested), detection, smoothing and control.
//
//   capture ─┬─ Err → skip cycle, Halt
//            └─ Ok(frame) → [calibrate] → detect → smooth → step → FrameContext

use super::event_bus::{EventBus, PipelineEvent};
use super::frame_context::FrameContext;
use super::metrics::PipelineMetrics;
use crate::calibration::Calibrator;
use crate::config::{BandLayout, Config};
use crate::control::{
    ControlLoop, ControllerState, DifferentialDrive, RecoveryPhase, RecoveryState,
};
use crate::detection::LineDetector;
use crate::error::LineError;
use crate::smoother::PositionSmoother;
use crate::types::{BandSet, CalibrationState, DetectionResult, Frame};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const MAX_PENDING_EVENTS: usize = 256;

pub struct LineFollower {
    layout: BandLayout,
    detector: LineDetector,
    control: ControlLoop,
    drive: DifferentialDrive,
    calibrator: Calibrator,
    smoother: Option<PositionSmoother>,
    controller: ControllerState,
    recovery: RecoveryState,
    calibration_pending: bool,
    /// Bands resolved for the last seen frame height.
    bands: Option<(usize, BandSet)>,
    frame_id: u64,
    metrics: PipelineMetrics,
    events: EventBus,
}

impl LineFollower {
    pub fn new(config: &Config) -> Result<Self, LineError> {
        config.validate()?;

        Ok(Self {
            layout: config.detection.bands.clone(),
            detector: LineDetector::from_config(config),
            control: ControlLoop::from_config(config),
            drive: DifferentialDrive::new(&config.drive),
            calibrator: Calibrator::new(CalibrationState::default()),
            smoother: config
                .filter
                .enabled
                .then(|| PositionSmoother::new(config.filter.alpha)),
            controller: ControllerState::default(),
            recovery: RecoveryState::default(),
            calibration_pending: config.detection.calibrate_on_start,
            bands: None,
            frame_id: 0,
            metrics: PipelineMetrics::new(),
            events: EventBus::new(MAX_PENDING_EVENTS),
        })
    }

    /// Calibrate on the next captured frame. One attempt per request; a
    /// successful one also leaves LOST.
    pub fn request_calibration(&mut self) {
        self.calibration_pending = true;
    }

    /// External reset out of LOST. Also re-arms calibration.
    pub fn reset(&mut self) {
        info!("External reset from {}", self.recovery.phase.as_str());
        self.clear_recovery();
        self.calibration_pending = true;
    }

    fn clear_recovery(&mut self) {
        self.recovery = RecoveryState::default();
        self.controller.reset();
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.reset();
        }
    }

    pub fn calibration(&self) -> CalibrationState {
        self.calibrator.state()
    }

    pub fn recovery(&self) -> RecoveryState {
        self.recovery
    }

    pub fn controller(&self) -> ControllerState {
        self.controller
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
        self.events.drain()
    }

    /// Events lost to a full queue since start.
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    /// Runs one cycle. `now` is the clock sample for this cycle.
    pub fn run_cycle(&mut self, capture: Result<Frame<'_>, LineError>, now: Duration) -> FrameContext {
        self.frame_id += 1;
        self.metrics.inc(&self.metrics.total_frames);
        let timestamp_ms = now.as_secs_f64() * 1000.0;

        let frame = match capture {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame {}: capture failed ({}), holding still", self.frame_id, e);
                self.metrics.inc(&self.metrics.capture_failures);
                self.events.publish(PipelineEvent::CaptureFailed {
                    frame_id: self.frame_id,
                    reason: e.to_string(),
                });
                return FrameContext::skipped(
                    self.frame_id,
                    timestamp_ms,
                    self.calibrator.state(),
                    self.recovery.phase,
                );
            }
        };

        if self.calibration_pending {
            self.calibration_pending = false;
            self.calibrate(&frame, timestamp_ms);
        }

        let started = Instant::now();
        let raw = self.detect(&frame);
        self.metrics.set_timing(
            &self.metrics.detect_time_us,
            started.elapsed().as_micros() as u64,
        );

        let detection = match self.smoother.as_mut() {
            Some(smoother) => smoother.smooth(&raw),
            None => raw,
        };

        if detection.detected {
            self.metrics.inc(&self.metrics.frames_with_line);
        }
        if detection.sharp_turn {
            self.metrics.inc(&self.metrics.sharp_turns);
            self.events.publish(PipelineEvent::SharpTurn {
                frame_id: self.frame_id,
                angle_degrees: detection.curve_angle_degrees,
                direction: detection.turn_direction,
            });
        }

        let previous = self.recovery;
        let out = self
            .control
            .step(&detection, self.controller, self.recovery, now);
        self.controller = out.controller;
        self.recovery = out.recovery;

        if out.transitioned_from(&previous) {
            self.on_phase_change(previous.phase, out.recovery.phase, timestamp_ms);
        }

        let motor = self.drive.output(&out.command);

        debug!(
            "Frame {}: {} pos={:.1} dev={:+.1} conf={} control={:+.1}",
            self.frame_id,
            out.recovery.phase.as_str(),
            detection.position,
            detection.deviation,
            detection.confidence,
            out.control_value
        );

        FrameContext {
            frame_id: self.frame_id,
            timestamp_ms,
            captured: true,
            calibration: self.calibrator.state(),
            detection,
            phase: out.recovery.phase,
            control_value: out.control_value,
            command: out.command,
            motor,
        }
    }

    fn calibrate(&mut self, frame: &Frame, timestamp_ms: f64) {
        match self.calibrator.recalibrate(frame) {
            Ok(state) => {
                self.metrics.inc(&self.metrics.calibrations);
                self.events.publish(PipelineEvent::Calibrated {
                    frame_id: self.frame_id,
                    state,
                });
                // Recalibrating counts as the operator's intervention.
                if self.recovery.phase == RecoveryPhase::Lost {
                    info!("Recalibrated while LOST, resuming from FOLLOWING");
                    self.clear_recovery();
                    self.on_phase_change(RecoveryPhase::Lost, RecoveryPhase::Following, timestamp_ms);
                }
            }
            Err(e) => {
                self.metrics.inc(&self.metrics.calibration_failures);
                self.events.publish(PipelineEvent::CalibrationFailed {
                    frame_id: self.frame_id,
                    reason: e.to_string(),
                    retained: self.calibrator.state(),
                });
            }
        }
    }

    fn detect(&mut self, frame: &Frame) -> DetectionResult {
        if !frame.is_grayscale() {
            return DetectionResult::not_detected();
        }
        let calibration = self.calibrator.state();
        match self.bands_for(frame.height()) {
            Ok(bands) => self.detector.detect(frame, &calibration, &bands),
            Err(e) => {
                warn!("Frame {}: {}", self.frame_id, e);
                DetectionResult::not_detected()
            }
        }
    }

    fn bands_for(&mut self, height: usize) -> Result<BandSet, LineError> {
        if let Some((h, bands)) = self.bands {
            if h == height {
                return Ok(bands);
            }
        }
        let bands = self.layout.resolve(height)?;
        self.bands = Some((height, bands));
        Ok(bands)
    }

    fn on_phase_change(&mut self, from: RecoveryPhase, to: RecoveryPhase, timestamp_ms: f64) {
        match to {
            RecoveryPhase::SearchingA => {
                self.metrics.inc(&self.metrics.searches_started);
                // Stale position must not bias the first frame after reacquiring.
                if let Some(smoother) = self.smoother.as_mut() {
                    smoother.reset();
                }
            }
            RecoveryPhase::Following => self.metrics.inc(&self.metrics.recoveries),
            RecoveryPhase::Lost => self.metrics.inc(&self.metrics.lost_events),
            RecoveryPhase::SearchingB => {}
        }
        self.events.publish(PipelineEvent::PhaseChanged {
            frame_id: self.frame_id,
            timestamp_ms,
            from,
            to,
        });
    }
}
