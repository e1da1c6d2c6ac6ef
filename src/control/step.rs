// src/control/step.rs
//
// One control tick: recovery transition first, then whichever actuation
// the resulting phase calls for.

use super::pid::{ControllerState, PidController};
use super::recovery::{RecoveryPhase, RecoveryState, RecoveryStateMachine, SearchDirection};
use crate::config::Config;
use crate::types::DetectionResult;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriveCommand {
    Steer { control: f32 },
    Search { direction: SearchDirection, control: f32 },
    Halt,
}

impl DriveCommand {
    pub fn control(&self) -> f32 {
        match self {
            Self::Steer { control } | Self::Search { control, .. } => *control,
            Self::Halt => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutput {
    pub control_value: f32,
    pub command: DriveCommand,
    pub controller: ControllerState,
    pub recovery: RecoveryState,
}

impl StepOutput {
    pub fn transitioned_from(&self, previous: &RecoveryState) -> bool {
        self.recovery.phase != previous.phase
    }
}

pub struct ControlLoop {
    pid: PidController,
    recovery: RecoveryStateMachine,
    search_control: f32,
}

impl ControlLoop {
    pub fn new(pid: PidController, recovery: RecoveryStateMachine, search_control: f32) -> Self {
        Self {
            pid,
            recovery,
            search_control: search_control.abs(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            PidController::from_config(&config.pid),
            RecoveryStateMachine::new(&config.recovery),
            config.recovery.search_control,
        )
    }

    pub fn step(
        &self,
        detection: &DetectionResult,
        controller: ControllerState,
        recovery: RecoveryState,
        now: Duration,
    ) -> StepOutput {
        let next = self.recovery.advance(recovery, detection.detected, now);
        let mut controller = controller;

        if next.phase != recovery.phase {
            match next.phase {
                RecoveryPhase::Following => {
                    controller.reset();
                    info!(
                        "Line reacquired after {} at {:.0}ms",
                        recovery.phase.as_str(),
                        now.as_secs_f64() * 1000.0
                    );
                }
                RecoveryPhase::Lost => warn!(
                    "Line lost: search exhausted at {:.0}ms, halting",
                    now.as_secs_f64() * 1000.0
                ),
                phase => info!("Recovery: {} -> {}", recovery.phase.as_str(), phase.as_str()),
            }
        }

        let command = match next.phase {
            RecoveryPhase::Following if detection.detected => DriveCommand::Steer {
                control: self.pid.update(&mut controller, detection.deviation),
            },
            // Brief dropout: keep steering on the last error.
            RecoveryPhase::Following => DriveCommand::Steer {
                control: self.pid.hold(&controller),
            },
            RecoveryPhase::SearchingA | RecoveryPhase::SearchingB => {
                match self.recovery.search_direction(next.phase) {
                    Some(direction) => DriveCommand::Search {
                        direction,
                        control: direction.sign() * self.search_control,
                    },
                    None => DriveCommand::Halt,
                }
            }
            RecoveryPhase::Lost => DriveCommand::Halt,
        };

        StepOutput {
            control_value: command.control(),
            command,
            controller,
            recovery: next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CurveInfo, Regions};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn seen(position: f32) -> DetectionResult {
        DetectionResult::found(position, 20.0, 100, CurveInfo::straight(), Regions::default())
    }

    fn control_loop() -> ControlLoop {
        ControlLoop::from_config(&Config::default())
    }

    #[test]
    fn test_following_steers_towards_line() {
        let cl = control_loop();
        let out = cl.step(&seen(70.0), ControllerState::default(), RecoveryState::default(), ms(0));
        assert_eq!(out.recovery.phase, RecoveryPhase::Following);
        assert!(out.control_value > 0.0);
        assert!(out.control_value <= 100.0);
        assert_eq!(out.controller.previous_error, 20.0);
    }

    #[test]
    fn test_dropout_holds_last_error() {
        let cl = control_loop();
        let first = cl.step(&seen(60.0), ControllerState::default(), RecoveryState::default(), ms(0));
        let gap = cl.step(&DetectionResult::not_detected(), first.controller, first.recovery, ms(100));
        assert_eq!(gap.recovery.phase, RecoveryPhase::Following);
        assert_eq!(gap.controller, first.controller);
        assert!(gap.control_value > 0.0);
    }

    #[test]
    fn test_search_then_halt() {
        let cl = control_loop();
        let lost = DetectionResult::not_detected();
        let mut out = cl.step(&seen(50.0), ControllerState::default(), RecoveryState::default(), ms(0));

        out = cl.step(&lost, out.controller, out.recovery, ms(300));
        assert_eq!(
            out.command,
            DriveCommand::Search {
                direction: SearchDirection::Right,
                control: 60.0
            }
        );

        out = cl.step(&lost, out.controller, out.recovery, ms(1100));
        assert_eq!(out.recovery.phase, RecoveryPhase::SearchingB);
        assert_eq!(out.control_value, -60.0);

        out = cl.step(&lost, out.controller, out.recovery, ms(1800));
        assert_eq!(out.command, DriveCommand::Halt);
        assert_eq!(out.control_value, 0.0);
    }

    #[test]
    fn test_reacquire_resets_controller() {
        let cl = control_loop();
        let wound_up = ControllerState {
            previous_error: 35.0,
            integral: 50.0,
        };
        for phase in [RecoveryPhase::SearchingA, RecoveryPhase::SearchingB] {
            let searching = RecoveryState {
                phase,
                search_started_at: Some(ms(300)),
                last_seen_at: Some(ms(0)),
            };
            let out = cl.step(&seen(50.0), wound_up, searching, ms(500));
            assert_eq!(out.recovery.phase, RecoveryPhase::Following);
            // Reset happens before the fresh update with zero error.
            assert_eq!(out.controller.integral, 0.0);
            assert_eq!(out.controller.previous_error, 0.0);
            assert_eq!(out.control_value, 0.0);
        }
    }

    #[test]
    fn test_lost_stays_halted_on_detection() {
        let cl = control_loop();
        let lost = RecoveryState {
            phase: RecoveryPhase::Lost,
            search_started_at: Some(ms(0)),
            last_seen_at: Some(ms(0)),
        };
        let out = cl.step(&seen(40.0), ControllerState::default(), lost, ms(5000));
        assert_eq!(out.recovery.phase, RecoveryPhase::Lost);
        assert_eq!(out.command, DriveCommand::Halt);
    }
}
