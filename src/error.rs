// src/error.rs

use crate::types::PixelFormat;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LineError {
    /// No frame could be acquired this cycle.
    #[error("frame capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// Frame is not in the single-channel layout the scanner expects.
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),

    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    /// Histogram was flat; the previous calibration is still in effect.
    #[error("calibration failed: {0}")]
    CalibrationFailed(String),

    #[error("invalid scan band: rows {start}..{end} step {step}")]
    InvalidBand {
        start: usize,
        end: usize,
        step: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
