// src/calibration.rs
//
// Threshold and polarity selection from a sampled frame. Two-peak
// histogram split: the darkest dominant intensity and the brightest
// dominant intensity are averaged into the binarization threshold.

use crate::error::LineError;
use crate::types::{CalibrationState, Frame, Polarity};
use std::ops::Range;
use tracing::{debug, info, warn};

const DARK_HALF: Range<usize> = 0..128;
const LIGHT_HALF: Range<usize> = 128..256;

#[derive(Debug, Clone)]
pub struct IntensityHistogram {
    bins: [u32; 256],
    total: u64,
}

impl Default for IntensityHistogram {
    fn default() -> Self {
        Self {
            bins: [0; 256],
            total: 0,
        }
    }
}

impl IntensityHistogram {
    pub fn from_frame(frame: &Frame) -> Self {
        let mut hist = Self::default();
        for &v in frame.pixels() {
            hist.add(v, 1);
        }
        hist
    }

    pub fn add(&mut self, value: u8, count: u32) {
        self.bins[value as usize] += count;
        self.total += count as u64;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Index of the tallest bin in `range`; ties resolve to the lowest
    /// intensity. `None` when the range holds no samples.
    pub fn peak_in(&self, range: Range<usize>) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for idx in range {
            let count = self.bins[idx];
            if count == 0 {
                continue;
            }
            match best {
                Some((_, c)) if c >= count => {}
                _ => best = Some((idx, count)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Midpoint between the dark-half peak and the light-half peak.
    pub fn split_threshold(&self) -> Result<u8, LineError> {
        let dark = self.peak_in(DARK_HALF).ok_or_else(|| {
            LineError::CalibrationFailed("no samples below intensity 128".to_string())
        })?;
        let light = self.peak_in(LIGHT_HALF).ok_or_else(|| {
            LineError::CalibrationFailed("no samples at or above intensity 128".to_string())
        })?;
        Ok(((dark + light) / 2) as u8)
    }
}

/// Mean intensity over the outermost rows and columns, corners counted once.
pub fn border_mean(frame: &Frame) -> f32 {
    let (w, h) = (frame.width(), frame.height());
    if w == 0 || h == 0 {
        return 0.0;
    }

    let mut sum: u64 = 0;
    let mut count: u64 = 0;

    for y in [0, h - 1] {
        for &v in frame.row(y) {
            sum += v as u64;
            count += 1;
        }
        if h == 1 {
            break;
        }
    }

    if h > 2 {
        for y in 1..h - 1 {
            let row = frame.row(y);
            sum += row[0] as u64;
            count += 1;
            if w > 1 {
                sum += row[w - 1] as u64;
                count += 1;
            }
        }
    }

    sum as f32 / count as f32
}

/// A dark border means a dark floor, so the line must be the lighter value.
pub fn polarity_for(border_mean: f32, threshold: u8) -> Polarity {
    if border_mean < threshold as f32 {
        Polarity::LineLighter
    } else {
        Polarity::LineDarker
    }
}

pub fn calibrate(frame: &Frame) -> Result<CalibrationState, LineError> {
    if !frame.is_grayscale() {
        return Err(LineError::UnsupportedFormat(frame.format()));
    }

    let hist = IntensityHistogram::from_frame(frame);
    let threshold = hist.split_threshold()?;
    let border = border_mean(frame);
    let polarity = polarity_for(border, threshold);

    debug!(
        "Calibration histogram: {} samples, border mean {:.1}",
        hist.total(),
        border
    );

    Ok(CalibrationState {
        threshold,
        polarity,
    })
}

/// Holds the active calibration. A failed attempt leaves it untouched.
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    state: CalibrationState,
    calibrated: bool,
    failures: u32,
}

impl Calibrator {
    pub fn new(initial: CalibrationState) -> Self {
        Self {
            state: initial,
            calibrated: false,
            failures: 0,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn recalibrate(&mut self, frame: &Frame) -> Result<CalibrationState, LineError> {
        match calibrate(frame) {
            Ok(state) => {
                info!(
                    "Calibrated: threshold={} polarity={:?}",
                    state.threshold, state.polarity
                );
                self.state = state;
                self.calibrated = true;
                Ok(state)
            }
            Err(e) => {
                self.failures += 1;
                warn!(
                    "Calibration failed ({}), keeping threshold={} polarity={:?}",
                    e, self.state.threshold, self.state.polarity
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20x20 frame: border at `border`, interior split between two intensities.
    fn two_tone_frame(border: u8, major: u8, minor: u8, minor_cols: usize) -> Vec<u8> {
        let (w, h) = (20, 20);
        let mut data = vec![border; w * h];
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                data[y * w + x] = if x <= minor_cols { minor } else { major };
            }
        }
        data
    }

    #[test]
    fn test_threshold_from_two_peaks() {
        let mut hist = IntensityHistogram::default();
        hist.add(60, 500);
        hist.add(55, 40);
        hist.add(200, 900);
        hist.add(210, 30);
        assert_eq!(hist.split_threshold().unwrap(), 130);
    }

    #[test]
    fn test_frame_calibration_normal_polarity() {
        // 18x18 interior: 7 columns of 60, 11 columns of 200; border 220.
        let data = two_tone_frame(220, 200, 60, 7);
        let frame = Frame::new(20, 20, &data).unwrap();
        let state = calibrate(&frame).unwrap();
        assert_eq!(state.threshold, 130);
        assert!((border_mean(&frame) - 220.0).abs() < 1e-3);
        assert_eq!(state.polarity, Polarity::LineDarker);
    }

    #[test]
    fn test_dark_border_inverts_polarity() {
        let data = two_tone_frame(20, 60, 200, 4);
        let frame = Frame::new(20, 20, &data).unwrap();
        let state = calibrate(&frame).unwrap();
        assert_eq!(state.threshold, 130);
        assert_eq!(state.polarity, Polarity::LineLighter);
    }

    #[test]
    fn test_flat_image_fails() {
        let data = vec![90u8; 64];
        let frame = Frame::new(8, 8, &data).unwrap();
        assert!(matches!(
            calibrate(&frame),
            Err(LineError::CalibrationFailed(_))
        ));
    }

    #[test]
    fn test_failed_recalibration_keeps_previous_state() {
        let good = two_tone_frame(220, 200, 60, 7);
        let flat = vec![250u8; 400];
        let mut calibrator = Calibrator::default();

        let first = calibrator
            .recalibrate(&Frame::new(20, 20, &good).unwrap())
            .unwrap();
        assert!(calibrator.is_calibrated());

        assert!(calibrator
            .recalibrate(&Frame::new(20, 20, &flat).unwrap())
            .is_err());
        assert_eq!(calibrator.state(), first);
        assert_eq!(calibrator.failures(), 1);
    }

    #[test]
    fn test_rejects_non_grayscale() {
        let data = vec![0u8; 32];
        let frame = Frame::with_format(4, 4, crate::types::PixelFormat::Rgb565, &data);
        assert!(matches!(
            calibrate(&frame),
            Err(LineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_peak_ties_resolve_low() {
        let mut hist = IntensityHistogram::default();
        hist.add(10, 5);
        hist.add(40, 5);
        assert_eq!(hist.peak_in(0..128), Some(10));
        assert_eq!(hist.peak_in(128..256), None);
    }
}
