// src/detection/curve.rs
//
// Curve estimate from how the line shifts between the near, middle and
// far bands. Positive displacement means the line drifts right further
// ahead.

use crate::config::CurveConfig;
use crate::types::{CurveInfo, RegionResult, Regions, TurnDirection};
use tracing::debug;

pub struct CurveEstimator {
    config: CurveConfig,
}

impl CurveEstimator {
    pub fn new(config: CurveConfig) -> Self {
        Self { config }
    }

    pub fn estimate(&self, regions: &Regions, image_width: usize) -> CurveInfo {
        if regions.detected_count() < 2 || image_width == 0 {
            return CurveInfo::straight();
        }

        let displacement_px = match self.displacement_px(regions, image_width as f32) {
            Some(d) => d,
            None => return CurveInfo::straight(),
        };

        let span = self.config.vertical_span_ratio * image_width as f32;
        let angle_degrees = (displacement_px / span).atan().to_degrees();

        let direction = if displacement_px.abs() < self.config.straight_ratio * image_width as f32 {
            TurnDirection::Straight
        } else if displacement_px < 0.0 {
            TurnDirection::Left
        } else {
            TurnDirection::Right
        };

        let sharp_turn = angle_degrees.abs() > self.config.sharp_turn_degrees;
        if sharp_turn {
            debug!(
                "Sharp turn: {:.1} deg ({:?}), displacement {:.1}px",
                angle_degrees, direction, displacement_px
            );
        }

        CurveInfo {
            angle_degrees,
            direction,
            sharp_turn,
        }
    }

    /// Weighted mean of pairwise far-minus-near shifts, in pixels.
    fn displacement_px(&self, regions: &Regions, width: f32) -> Option<f32> {
        let pairs: [(&RegionResult, &RegionResult, f32); 3] = [
            (&regions.near, &regions.middle, 1.0),
            (&regions.middle, &regions.far, 1.0),
            (&regions.near, &regions.far, self.config.near_far_weight),
        ];

        let mut weighted = 0.0f32;
        let mut weights = 0.0f32;
        for (lower, upper, weight) in pairs {
            if let (Some(lo), Some(up)) = (lower.position(), upper.position()) {
                weighted += weight * (up - lo) / 100.0 * width;
                weights += weight;
            }
        }

        (weights > 0.0).then(|| weighted / weights)
    }
}

impl Default for CurveEstimator {
    fn default() -> Self {
        Self::new(CurveConfig::default())
    }
}
