// src/pipeline/event_bus.rs
//
// Decoupled event log. The cycle publishes what happened; the host
// drains it for display or logging without reaching into core state.

use crate::control::RecoveryPhase;
use crate::types::{CalibrationState, TurnDirection};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Calibrated {
        frame_id: u64,
        state: CalibrationState,
    },

    CalibrationFailed {
        frame_id: u64,
        reason: String,
        retained: CalibrationState,
    },

    CaptureFailed {
        frame_id: u64,
        reason: String,
    },

    PhaseChanged {
        frame_id: u64,
        timestamp_ms: f64,
        from: RecoveryPhase,
        to: RecoveryPhase,
    },

    SharpTurn {
        frame_id: u64,
        angle_degrees: f32,
        direction: TurnDirection,
    },
}

impl PipelineEvent {
    pub fn frame_id(&self) -> u64 {
        match self {
            Self::Calibrated { frame_id, .. }
            | Self::CalibrationFailed { frame_id, .. }
            | Self::CaptureFailed { frame_id, .. }
            | Self::PhaseChanged { frame_id, .. }
            | Self::SharpTurn { frame_id, .. } => *frame_id,
        }
    }

    /// Phase changes are the last events evicted from a full queue.
    pub fn is_phase_change(&self) -> bool {
        matches!(self, Self::PhaseChanged { .. })
    }
}

/// Bounded queue between the cycle and the host. When full, the oldest
/// non-phase-change event is dropped first.
pub struct EventBus {
    events: VecDeque<PipelineEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn publish(&mut self, event: PipelineEvent) {
        if self.events.len() >= self.capacity {
            let victim = self
                .events
                .iter()
                .position(|e| !e.is_phase_change())
                .unwrap_or(0);
            if let Some(old) = self.events.remove(victim) {
                self.dropped += 1;
                warn!(
                    "Event queue full ({}), dropped event from frame {}",
                    self.capacity,
                    old.frame_id()
                );
            }
        }
        self.events.push_back(event);
    }

    /// Everything queued, oldest first.
    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
