// src/control/pid.rs

use crate::config::PidConfig;
use serde::Serialize;

/// Integral and derivative memory. Owned by whoever drives the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ControllerState {
    pub previous_error: f32,
    pub integral: f32,
}

impl ControllerState {
    pub fn reset(&mut self) {
        self.previous_error = 0.0;
        self.integral = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    /// Anti-windup band for the accumulated error.
    integral_limit: f32,
    output_limit: f32,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral_limit: 50.0,
            output_limit: 100.0,
        }
    }

    pub fn with_limits(mut self, integral_limit: f32, output_limit: f32) -> Self {
        self.integral_limit = integral_limit.abs();
        self.output_limit = output_limit.abs();
        self
    }

    pub fn from_config(config: &PidConfig) -> Self {
        Self::new(PidGains {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
        })
        .with_limits(config.integral_limit, config.output_limit)
    }

    /// One controller tick. `error` is the line deviation (-50..50).
    pub fn update(&self, state: &mut ControllerState, error: f32) -> f32 {
        let p = self.gains.kp * error;

        state.integral = (state.integral + error).clamp(-self.integral_limit, self.integral_limit);
        let i = self.gains.ki * state.integral;

        let d = self.gains.kd * (error - state.previous_error);
        state.previous_error = error;

        (p + i + d).clamp(-self.output_limit, self.output_limit)
    }

    /// Output for repeating the last error, without touching the state.
    pub fn hold(&self, state: &ControllerState) -> f32 {
        let out = self.gains.kp * state.previous_error + self.gains.ki * state.integral;
        out.clamp(-self.output_limit, self.output_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proportional(kp: f32) -> PidController {
        PidController::new(PidGains {
            kp,
            ki: 0.0,
            kd: 0.0,
        })
    }

    #[test]
    fn test_pure_proportional() {
        let pid = proportional(2.0);
        let mut state = ControllerState::default();
        assert_eq!(pid.update(&mut state, 10.0), 20.0);

        let mut state = ControllerState::default();
        assert_eq!(pid.update(&mut state, 80.0), 100.0);
        assert_eq!(pid.update(&mut state, -80.0), -100.0);
    }

    #[test]
    fn test_integral_clamped() {
        let pid = PidController::new(PidGains {
            kp: 0.0,
            ki: 1.0,
            kd: 0.0,
        });
        let mut state = ControllerState::default();
        for _ in 0..20 {
            pid.update(&mut state, 40.0);
        }
        assert_eq!(state.integral, 50.0);
        assert_eq!(pid.update(&mut state, 40.0), 50.0);
    }

    #[test]
    fn test_derivative_uses_previous_error() {
        let pid = PidController::new(PidGains {
            kp: 0.0,
            ki: 0.0,
            kd: 0.5,
        });
        let mut state = ControllerState::default();
        assert_eq!(pid.update(&mut state, 10.0), 5.0);
        assert_eq!(pid.update(&mut state, 10.0), 0.0);
        assert_eq!(pid.update(&mut state, 4.0), -3.0);
        assert_eq!(state.previous_error, 4.0);
    }

    #[test]
    fn test_deterministic() {
        let pid = PidController::from_config(&PidConfig::default());
        let errors = [3.0, -7.5, 12.0, 0.0, 49.0];

        let run = || {
            let mut state = ControllerState::default();
            errors.iter().map(|&e| pid.update(&mut state, e)).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_hold_is_side_effect_free() {
        let pid = proportional(1.5);
        let mut state = ControllerState::default();
        pid.update(&mut state, 20.0);
        let before = state;
        assert_eq!(pid.hold(&state), 30.0);
        assert_eq!(state, before);
    }
}
