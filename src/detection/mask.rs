// src/detection/mask.rs
//
// Pixel classification shared by every scan path. The scanner only
// asks "is (x, y) line?"; grayscale and packed binary frames answer it
// differently.

use crate::types::{CalibrationState, Frame, Polarity};

pub trait LineMask {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn is_line(&self, x: usize, y: usize) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelClassifier {
    pub threshold: u8,
    pub polarity: Polarity,
}

impl PixelClassifier {
    #[inline]
    pub fn is_line(&self, value: u8) -> bool {
        match self.polarity {
            Polarity::LineDarker => value < self.threshold,
            Polarity::LineLighter => value >= self.threshold,
        }
    }
}

impl From<CalibrationState> for PixelClassifier {
    fn from(state: CalibrationState) -> Self {
        Self {
            threshold: state.threshold,
            polarity: state.polarity,
        }
    }
}

/// Grayscale frame read through a threshold/polarity predicate.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedFrame<'a> {
    frame: Frame<'a>,
    classifier: PixelClassifier,
}

impl<'a> ClassifiedFrame<'a> {
    pub fn new(frame: Frame<'a>, calibration: &CalibrationState) -> Self {
        Self {
            frame,
            classifier: PixelClassifier::from(*calibration),
        }
    }
}

impl LineMask for ClassifiedFrame<'_> {
    fn width(&self) -> usize {
        self.frame.width()
    }

    fn height(&self) -> usize {
        self.frame.height()
    }

    fn is_line(&self, x: usize, y: usize) -> bool {
        self.frame
            .get(x, y)
            .map(|v| self.classifier.is_line(v))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_polarity() {
        let dark = PixelClassifier {
            threshold: 100,
            polarity: Polarity::LineDarker,
        };
        assert!(dark.is_line(99));
        assert!(!dark.is_line(100));

        let light = PixelClassifier {
            threshold: 100,
            polarity: Polarity::LineLighter,
        };
        assert!(light.is_line(100));
        assert!(!light.is_line(99));
    }

    #[test]
    fn test_out_of_bounds_is_background() {
        let data = vec![0u8; 4];
        let frame = Frame::new(2, 2, &data).unwrap();
        let mask = ClassifiedFrame::new(frame, &CalibrationState::default());
        assert!(mask.is_line(1, 1));
        assert!(!mask.is_line(2, 0));
    }
}
