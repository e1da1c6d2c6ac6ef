// src/types.rs

use crate::error::LineError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Grayscale,
    Rgb565,
}

/// Borrowed view over one captured image. Lives for a single detection call.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    width: usize,
    height: usize,
    format: PixelFormat,
    pixels: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Single-channel 8-bit frame. `pixels` must hold exactly `width * height` bytes.
    pub fn new(width: usize, height: usize, pixels: &'a [u8]) -> Result<Self, LineError> {
        let expected = width.checked_mul(height).ok_or(LineError::FrameSize {
            expected: usize::MAX,
            actual: pixels.len(),
        })?;

        if pixels.len() != expected {
            return Err(LineError::FrameSize {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            format: PixelFormat::Grayscale,
            pixels,
        })
    }

    /// Frame in an arbitrary format. No size check is made for non-grayscale
    /// layouts since detection refuses them anyway.
    pub fn with_format(width: usize, height: usize, format: PixelFormat, pixels: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &'a [u8] {
        self.pixels
    }

    pub fn is_grayscale(&self) -> bool {
        self.format == PixelFormat::Grayscale
            && self.width > 0
            && self.height > 0
            && self.width.checked_mul(self.height) == Some(self.pixels.len())
    }

    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.width;
        &self.pixels[start..start + self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }
}

/// Owned frame buffer as handed over by the acquisition side.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub timestamp_ms: f64,
}

impl FrameBuffer {
    pub fn grayscale(width: usize, height: usize, data: Vec<u8>, timestamp_ms: f64) -> Self {
        Self {
            data,
            width,
            height,
            format: PixelFormat::Grayscale,
            timestamp_ms,
        }
    }

    pub fn as_frame(&self) -> Frame<'_> {
        Frame::with_format(self.width, self.height, self.format, &self.data)
    }
}

/// Which side of the threshold the line sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Dark line on a light floor.
    LineDarker,
    /// Light line on a dark floor.
    LineLighter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationState {
    pub threshold: u8,
    pub polarity: Polarity,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            threshold: 128,
            polarity: Polarity::LineDarker,
        }
    }
}

/// Horizontal slice of the image scanned as one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanBand {
    start_row: usize,
    end_row: usize,
    row_step: usize,
}

impl ScanBand {
    pub fn new(start_row: usize, end_row: usize, row_step: usize) -> Result<Self, LineError> {
        if row_step == 0 || start_row >= end_row {
            return Err(LineError::InvalidBand {
                start: start_row,
                end: end_row,
                step: row_step,
            });
        }
        Ok(Self {
            start_row,
            end_row,
            row_step,
        })
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    pub fn end_row(&self) -> usize {
        self.end_row
    }

    pub fn row_step(&self) -> usize {
        self.row_step
    }

    /// Rows visited in a frame of the given height.
    pub fn rows(&self, frame_height: usize) -> impl Iterator<Item = usize> {
        let end = self.end_row.min(frame_height);
        (self.start_row..end).step_by(self.row_step)
    }

    pub fn row_count(&self, frame_height: usize) -> usize {
        self.rows(frame_height).count()
    }
}

/// The three scan bands, near being the bottom of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BandSet {
    pub near: ScanBand,
    pub middle: ScanBand,
    pub far: ScanBand,
}

impl BandSet {
    pub fn iter(&self) -> impl Iterator<Item = &ScanBand> {
        [&self.near, &self.middle, &self.far].into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowScan {
    pub found: bool,
    pub start: usize,
    pub end: usize,
}

impl RowScan {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn width(&self) -> usize {
        if self.found {
            self.end - self.start + 1
        } else {
            0
        }
    }

    pub fn is_valid(&self, min_line_width: usize) -> bool {
        self.found && self.width() >= min_line_width
    }

    pub fn center(&self) -> f32 {
        (self.start + self.end) as f32 / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RegionResult {
    pub detected: bool,
    /// 0..100 across the image width. Meaningless when `detected` is false.
    pub position: f32,
    pub width: f32,
    pub sample_count: usize,
    pub rows_scanned: usize,
}

impl RegionResult {
    pub fn position(&self) -> Option<f32> {
        self.detected.then_some(self.position)
    }
}

/// Region results ordered bottom-to-top of the image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Regions {
    pub near: RegionResult,
    pub middle: RegionResult,
    pub far: RegionResult,
}

impl Regions {
    pub fn iter(&self) -> impl Iterator<Item = &RegionResult> {
        [&self.near, &self.middle, &self.far].into_iter()
    }

    pub fn detected_count(&self) -> usize {
        self.iter().filter(|r| r.detected).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Left,
    Right,
    Straight,
}

/// Curve estimate derived from the three regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurveInfo {
    pub angle_degrees: f32,
    pub direction: TurnDirection,
    pub sharp_turn: bool,
}

impl CurveInfo {
    pub fn straight() -> Self {
        Self {
            angle_degrees: 0.0,
            direction: TurnDirection::Straight,
            sharp_turn: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionResult {
    pub detected: bool,
    pub position: f32,
    pub deviation: f32,
    pub width: f32,
    pub confidence: u8,
    pub curve_angle_degrees: f32,
    pub turn_direction: TurnDirection,
    pub sharp_turn: bool,
    pub regions: Regions,
}

impl DetectionResult {
    pub fn not_detected() -> Self {
        Self {
            detected: false,
            position: 50.0,
            deviation: 0.0,
            width: 0.0,
            confidence: 0,
            curve_angle_degrees: 0.0,
            turn_direction: TurnDirection::Straight,
            sharp_turn: false,
            regions: Regions::default(),
        }
    }

    /// Builds a positive result, keeping `deviation == position - 50`.
    pub fn found(position: f32, width: f32, confidence: u8, curve: CurveInfo, regions: Regions) -> Self {
        let position = position.clamp(0.0, 100.0);
        Self {
            detected: true,
            position,
            deviation: position - 50.0,
            width,
            confidence: confidence.min(100),
            curve_angle_degrees: curve.angle_degrees,
            turn_direction: curve.direction,
            sharp_turn: curve.sharp_turn,
            regions,
        }
    }

    /// Same result with a different (e.g. smoothed) position.
    pub fn with_position(&self, position: f32) -> Self {
        let position = position.clamp(0.0, 100.0);
        Self {
            position,
            deviation: position - 50.0,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rejects_wrong_length() {
        let data = vec![0u8; 10];
        let err = Frame::new(4, 4, &data).unwrap_err();
        assert_eq!(
            err,
            LineError::FrameSize {
                expected: 16,
                actual: 10
            }
        );
    }

    #[test]
    fn test_band_rejects_zero_step() {
        assert!(ScanBand::new(0, 10, 0).is_err());
        assert!(ScanBand::new(10, 10, 1).is_err());
    }

    #[test]
    fn test_band_rows_clipped_to_frame() {
        let band = ScanBand::new(8, 20, 4).unwrap();
        let rows: Vec<usize> = band.rows(14).collect();
        assert_eq!(rows, vec![8, 12]);
    }

    #[test]
    fn test_deviation_identity_after_reposition() {
        let r = DetectionResult::found(30.0, 12.0, 80, CurveInfo::straight(), Regions::default());
        assert_eq!(r.deviation, r.position - 50.0);
        let moved = r.with_position(72.5);
        assert_eq!(moved.deviation, moved.position - 50.0);
        let clamped = r.with_position(130.0);
        assert_eq!(clamped.position, 100.0);
        assert_eq!(clamped.deviation, 50.0);
    }
}
