// src/pipeline/frame_context.rs
//
// Everything one cycle decided, in one value. Telemetry and overlays read
// this instead of the live core state.

use crate::control::{DriveCommand, MotorOutput, RecoveryPhase};
use crate::types::{CalibrationState, DetectionResult};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FrameContext {
    pub frame_id: u64,
    pub timestamp_ms: f64,
    /// False when no frame could be captured this cycle.
    pub captured: bool,
    pub calibration: CalibrationState,
    pub detection: DetectionResult,
    pub phase: RecoveryPhase,
    pub control_value: f32,
    pub command: DriveCommand,
    pub motor: MotorOutput,
}

impl FrameContext {
    /// Cycle skipped for lack of a frame: nothing detected, wheels stopped.
    pub fn skipped(
        frame_id: u64,
        timestamp_ms: f64,
        calibration: CalibrationState,
        phase: RecoveryPhase,
    ) -> Self {
        Self {
            frame_id,
            timestamp_ms,
            captured: false,
            calibration,
            detection: DetectionResult::not_detected(),
            phase,
            control_value: 0.0,
            command: DriveCommand::Halt,
            motor: MotorOutput::default(),
        }
    }

    pub fn is_following(&self) -> bool {
        self.phase == RecoveryPhase::Following && self.detection.detected
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.command, DriveCommand::Halt)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
