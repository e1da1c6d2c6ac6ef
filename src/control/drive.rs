// src/control/drive.rs
//
// Differential mixing for the motor side. Pin mapping and PWM belong to
// whatever implements `Actuator`.

use super::step::DriveCommand;
use crate::config::DriveConfig;
use anyhow::Result;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MotorOutput {
    pub left: f32,
    pub right: f32,
}

#[derive(Debug, Clone)]
pub struct DifferentialDrive {
    base_speed: f32,
    search_speed: f32,
    max_speed: f32,
}

impl DifferentialDrive {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            base_speed: config.base_speed,
            search_speed: config.search_speed,
            max_speed: config.max_speed.abs(),
        }
    }

    /// `control` in -100..100, positive turns right (left wheel faster).
    pub fn mix(&self, control: f32, speed: f32) -> MotorOutput {
        let c = control.clamp(-100.0, 100.0) / 100.0;
        MotorOutput {
            left: (speed * (1.0 + c)).clamp(-self.max_speed, self.max_speed),
            right: (speed * (1.0 - c)).clamp(-self.max_speed, self.max_speed),
        }
    }

    pub fn output(&self, command: &DriveCommand) -> MotorOutput {
        match command {
            DriveCommand::Steer { control } => self.mix(*control, self.base_speed),
            DriveCommand::Search { control, .. } => self.mix(*control, self.search_speed),
            DriveCommand::Halt => MotorOutput::default(),
        }
    }
}

pub trait Actuator {
    fn apply(&mut self, command: &DriveCommand, output: MotorOutput) -> Result<()>;
}

/// Actuator that only records and logs what it was asked to do.
#[derive(Debug, Default)]
pub struct LoggingActuator {
    last: Option<MotorOutput>,
    commands: u64,
}

impl LoggingActuator {
    pub fn last(&self) -> Option<MotorOutput> {
        self.last
    }

    pub fn commands(&self) -> u64 {
        self.commands
    }
}

impl Actuator for LoggingActuator {
    fn apply(&mut self, command: &DriveCommand, output: MotorOutput) -> Result<()> {
        debug!(
            "Drive {:?}: left={:.1} right={:.1}",
            command, output.left, output.right
        );
        self.last = Some(output);
        self.commands += 1;
        Ok(())
    }
}
