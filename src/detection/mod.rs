// src/detection/mod.rs
//
// Signal flow:
//   Frame + CalibrationState → mask (ClassifiedFrame | BinaryFrame)
//     → scanner (near / middle / far bands) → RegionResults
//     → confidence + curve → DetectionResult

mod binary;
mod confidence;
mod curve;
mod detector;
mod mask;
mod scanner;

// Re-export public APIs
pub use binary::{packed_len, BinaryFrame};
pub use confidence::{confidence, consistency_score, width_score};
pub use curve::CurveEstimator;
pub use detector::{detect, LineDetector, PixelPath};
pub use mask::{ClassifiedFrame, LineMask, PixelClassifier};
pub use scanner::{scan_region, scan_row, ScanMode, ScanParams};
