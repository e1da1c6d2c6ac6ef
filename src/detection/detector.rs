// src/detection/detector.rs

use super::binary::BinaryFrame;
use super::confidence::confidence;
use super::curve::CurveEstimator;
use super::mask::{ClassifiedFrame, LineMask};
use super::scanner::{scan_region, ScanParams};
use crate::config::{Config, CurveConfig};
use crate::types::{BandSet, CalibrationState, DetectionResult, Frame, Regions};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which representation the scanner reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelPath {
    Grayscale,
    /// Pack the frame to 1 bit per pixel first.
    Binary,
}

pub struct LineDetector {
    params: ScanParams,
    curve: CurveEstimator,
    path: PixelPath,
}

impl LineDetector {
    pub fn new(params: ScanParams, curve: CurveConfig, path: PixelPath) -> Self {
        Self {
            params,
            curve: CurveEstimator::new(curve),
            path,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.detection.scan_params(),
            config.curve.clone(),
            config.detection.pixel_path,
        )
    }

    /// Never fails: unsupported frames come back as "not detected".
    pub fn detect(
        &self,
        frame: &Frame,
        calibration: &CalibrationState,
        bands: &BandSet,
    ) -> DetectionResult {
        if !frame.is_grayscale() {
            debug!(
                "Skipping detection: unsupported frame {:?} {}x{}",
                frame.format(),
                frame.width(),
                frame.height()
            );
            return DetectionResult::not_detected();
        }

        match self.path {
            PixelPath::Grayscale => self.detect_in(&ClassifiedFrame::new(*frame, calibration), bands),
            PixelPath::Binary => match BinaryFrame::from_frame(frame, calibration) {
                Ok(packed) => self.detect_in(&packed, bands),
                Err(_) => DetectionResult::not_detected(),
            },
        }
    }

    pub fn detect_in<M: LineMask>(&self, mask: &M, bands: &BandSet) -> DetectionResult {
        let regions = Regions {
            near: scan_region(mask, &bands.near, &self.params),
            middle: scan_region(mask, &bands.middle, &self.params),
            far: scan_region(mask, &bands.far, &self.params),
        };

        let samples: usize = regions.iter().map(|r| r.sample_count).sum();
        let rows: usize = regions.iter().map(|r| r.rows_scanned).sum();

        if samples == 0 {
            return DetectionResult {
                regions,
                ..DetectionResult::not_detected()
            };
        }

        // Sample-weighted mean over the detected regions.
        let (position, width) = regions
            .iter()
            .filter(|r| r.detected)
            .fold((0.0f32, 0.0f32), |(p, w), r| {
                let n = r.sample_count as f32;
                (p + r.position * n, w + r.width * n)
            });
        let position = position / samples as f32;
        let width = width / samples as f32;

        let score = confidence(width, samples, rows, &self.params);
        let curve = self.curve.estimate(&regions, mask.width());

        debug!(
            "Line at {:.1}% width {:.1}px conf {}% ({}/{} rows), curve {:.1} deg {:?}",
            position, width, score, samples, rows, curve.angle_degrees, curve.direction
        );

        DetectionResult::found(position, width, score, curve, regions)
    }
}

/// One-shot detection with default curve settings and the given minimum width.
pub fn detect(
    frame: &Frame,
    calibration: &CalibrationState,
    bands: &BandSet,
    min_line_width: usize,
) -> DetectionResult {
    let params = ScanParams {
        min_line_width,
        ..ScanParams::default()
    };
    LineDetector::new(params, CurveConfig::default(), PixelPath::Grayscale).detect(
        frame,
        calibration,
        bands,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BandLayout;
    use crate::types::{PixelFormat, Polarity, TurnDirection};

    const W: usize = 100;
    const H: usize = 60;

    /// Light floor with a dark line whose center is `center(y)`.
    fn line_frame(half_width: usize, center: impl Fn(usize) -> usize) -> Vec<u8> {
        let mut data = vec![230u8; W * H];
        for y in 0..H {
            let c = center(y);
            for x in c.saturating_sub(half_width)..=(c + half_width).min(W - 1) {
                data[y * W + x] = 25;
            }
        }
        data
    }

    fn bands() -> BandSet {
        BandLayout::default().resolve(H).unwrap()
    }

    #[test]
    fn test_centered_straight_line() {
        let data = line_frame(10, |_| 50);
        let frame = Frame::new(W, H, &data).unwrap();
        let result = detect(&frame, &CalibrationState::default(), &bands(), 10);

        assert!(result.detected);
        assert!((result.position - 50.0).abs() < 1e-3);
        assert_eq!(result.deviation, result.position - 50.0);
        assert_eq!(result.width, 21.0);
        assert_eq!(result.confidence, 100);
        assert_eq!(result.turn_direction, TurnDirection::Straight);
        assert_eq!(result.regions.detected_count(), 3);
    }

    #[test]
    fn test_blank_frame_not_detected() {
        let data = vec![230u8; W * H];
        let frame = Frame::new(W, H, &data).unwrap();
        let result = detect(&frame, &CalibrationState::default(), &bands(), 10);
        assert!(!result.detected);
        assert_eq!(result.confidence, 0);
        assert!(result.regions.near.rows_scanned > 0);
    }

    #[test]
    fn test_unsupported_format_skips_scan() {
        let data = vec![0u8; W * H * 2];
        let frame = Frame::with_format(W, H, PixelFormat::Rgb565, &data);
        let result = detect(&frame, &CalibrationState::default(), &bands(), 10);
        assert!(!result.detected);
        assert_eq!(result.regions.near.rows_scanned, 0);
    }

    #[test]
    fn test_overflowing_dimensions_not_detected() {
        let data = [0u8; 16];
        let frame = Frame::with_format(usize::MAX / 2 + 1, 2, PixelFormat::Grayscale, &data);
        assert!(!frame.is_grayscale());

        let result = detect(&frame, &CalibrationState::default(), &bands(), 10);
        assert!(!result.detected);
        assert!(BinaryFrame::from_frame(&frame, &CalibrationState::default()).is_err());
        assert!(crate::calibration::calibrate(&frame).is_err());
    }

    #[test]
    fn test_curving_line_reports_turn() {
        // Center moves right as y decreases (further ahead).
        let data = line_frame(6, |y| 30 + (H - 1 - y));
        let frame = Frame::new(W, H, &data).unwrap();
        let result = detect(&frame, &CalibrationState::default(), &bands(), 10);
        assert!(result.detected);
        assert_eq!(result.turn_direction, TurnDirection::Right);
        assert!(result.curve_angle_degrees > 0.0);
    }

    #[test]
    fn test_binary_path_matches_grayscale() {
        let data = line_frame(8, |y| 20 + y / 2);
        let frame = Frame::new(W, H, &data).unwrap();
        let calibration = CalibrationState::default();

        let gray = LineDetector::new(ScanParams::default(), CurveConfig::default(), PixelPath::Grayscale)
            .detect(&frame, &calibration, &bands());
        let packed = LineDetector::new(ScanParams::default(), CurveConfig::default(), PixelPath::Binary)
            .detect(&frame, &calibration, &bands());

        assert_eq!(gray, packed);
    }

    #[test]
    fn test_light_line_on_dark_floor() {
        let data: Vec<u8> = line_frame(10, |_| 70).iter().map(|v| 255 - v).collect();
        let frame = Frame::new(W, H, &data).unwrap();
        let calibration = CalibrationState {
            threshold: 128,
            polarity: Polarity::LineLighter,
        };
        let result = detect(&frame, &calibration, &bands(), 10);
        assert!(result.detected);
        assert!((result.position - 70.0).abs() < 1e-3);
        assert!((result.deviation - 20.0).abs() < 1e-3);
    }
}
