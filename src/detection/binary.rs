// src/detection/binary.rs
//
// Packed 1-bit frames: 8 pixels per byte, MSB first, bit set = bright
// (value >= threshold). An eighth of the grayscale footprint.

use super::mask::LineMask;
use crate::error::LineError;
use crate::types::{CalibrationState, Frame, Polarity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFrame {
    width: usize,
    height: usize,
    bits: Vec<u8>,
    polarity: Polarity,
}

impl BinaryFrame {
    pub fn from_frame(frame: &Frame, calibration: &CalibrationState) -> Result<Self, LineError> {
        if !frame.is_grayscale() {
            return Err(LineError::UnsupportedFormat(frame.format()));
        }

        let (width, height) = (frame.width(), frame.height());
        let mut bits = vec![0u8; packed_len(width, height)];

        for (idx, &value) in frame.pixels().iter().enumerate() {
            if value >= calibration.threshold {
                bits[idx / 8] |= 1 << (7 - (idx % 8));
            }
        }

        Ok(Self {
            width,
            height,
            bits,
            polarity: calibration.polarity,
        })
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// True when the pixel was at or above the threshold.
    pub fn is_bright(&self, x: usize, y: usize) -> bool {
        let idx = y * self.width + x;
        (self.bits[idx / 8] >> (7 - (idx % 8))) & 1 == 1
    }
}

pub fn packed_len(width: usize, height: usize) -> usize {
    (width * height).div_ceil(8)
}

impl LineMask for BinaryFrame {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn is_line(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        match self.polarity {
            Polarity::LineDarker => !self.is_bright(x, y),
            Polarity::LineLighter => self.is_bright(x, y),
        }
    }
}
