// src/lib.rs

pub mod calibration;
pub mod config;
pub mod control;
pub mod detection;
pub mod error;
pub mod frame_source;
pub mod overlay;
pub mod pipeline;
pub mod smoother;
pub mod types;

pub use calibration::{calibrate, Calibrator};
pub use config::Config;
pub use control::{ControlLoop, DriveCommand, StepOutput};
pub use detection::{detect, LineDetector};
pub use error::LineError;
pub use pipeline::{FrameContext, LineFollower};
pub use types::{CalibrationState, DetectionResult, Frame, FrameBuffer};
