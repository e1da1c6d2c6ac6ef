// src/smoother.rs

use crate::types::DetectionResult;

/// `alpha * current + (1 - alpha) * previous`.
pub fn blend(alpha: f32, current: f32, previous: f32) -> f32 {
    alpha * current + (1.0 - alpha) * previous
}

/// Exponential smoother for the detected line position across frames
pub struct PositionSmoother {
    alpha: f32,
    previous: Option<f32>,
    samples: usize,
}

impl PositionSmoother {
    /// Create a new smoother
    ///
    /// # Arguments
    /// * `alpha` - Weight of the newest sample (0.3 - 0.5 damps without lagging)
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            previous: None,
            samples: 0,
        }
    }

    /// Smooth one position sample. The first sample passes through.
    pub fn smooth_value(&mut self, current: f32) -> f32 {
        let filtered = match self.previous {
            Some(previous) => blend(self.alpha, current, previous),
            None => current,
        };
        self.previous = Some(filtered);
        self.samples += 1;
        filtered
    }

    /// Smooth the position of a detection, keeping deviation consistent.
    ///
    /// Frames without a line pass through untouched and do not disturb the
    /// filter state.
    pub fn smooth(&mut self, detection: &DetectionResult) -> DetectionResult {
        if !detection.detected {
            return *detection;
        }
        let position = self.smooth_value(detection.position);
        detection.with_position(position)
    }

    /// Reset the smoother (e.g., after the line was lost and found again)
    pub fn reset(&mut self) {
        self.previous = None;
        self.samples = 0;
    }

    /// Get the number of samples folded in since the last reset
    pub fn history_size(&self) -> usize {
        self.samples
    }
}
