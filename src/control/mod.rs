// src/control/mod.rs
//
// DetectionResult → ControlLoop::step (recovery transition, then PID or
// search) → DriveCommand → DifferentialDrive → Actuator.

pub mod clock;
pub mod drive;
pub mod pid;
pub mod recovery;
pub mod step;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use drive::{Actuator, DifferentialDrive, LoggingActuator, MotorOutput};
pub use pid::{ControllerState, PidController, PidGains};
pub use recovery::{RecoveryPhase, RecoveryState, RecoveryStateMachine, SearchDirection};
pub use step::{ControlLoop, DriveCommand, StepOutput};
