// src/config.rs

use crate::control::SearchDirection;
use crate::detection::{PixelPath, ScanMode, ScanParams};
use crate::error::LineError;
use crate::types::{BandSet, ScanBand};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub curve: CurveConfig,
    pub filter: FilterConfig,
    pub pid: PidConfig,
    pub recovery: RecoveryConfig,
    pub drive: DriveConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub min_line_width: usize,
    /// Widths above this are treated as likely noise by the confidence scorer.
    pub max_ideal_width: usize,
    pub scan_mode: ScanMode,
    pub pixel_path: PixelPath,
    pub bands: BandLayout,
    pub calibrate_on_start: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_line_width: 10,
            max_ideal_width: 50,
            scan_mode: ScanMode::FirstLast,
            pixel_path: PixelPath::Grayscale,
            bands: BandLayout::default(),
            calibrate_on_start: true,
        }
    }
}

impl DetectionConfig {
    pub fn scan_params(&self) -> ScanParams {
        ScanParams {
            min_line_width: self.min_line_width,
            max_ideal_width: self.max_ideal_width,
            mode: self.scan_mode,
        }
    }
}

/// Band boundaries as fractions of the image height (0 = top row).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandRatio {
    pub start: f32,
    pub end: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BandLayout {
    pub far: BandRatio,
    pub middle: BandRatio,
    pub near: BandRatio,
    pub rows_per_band: usize,
}

impl Default for BandLayout {
    fn default() -> Self {
        Self {
            far: BandRatio {
                start: 0.0,
                end: 1.0 / 3.0,
            },
            middle: BandRatio {
                start: 1.0 / 3.0,
                end: 2.0 / 3.0,
            },
            near: BandRatio {
                start: 2.0 / 3.0,
                end: 1.0,
            },
            rows_per_band: 8,
        }
    }
}

impl BandLayout {
    /// Concrete row ranges for a frame of `height` rows.
    pub fn resolve(&self, height: usize) -> Result<BandSet, LineError> {
        Ok(BandSet {
            near: self.resolve_one(self.near, height)?,
            middle: self.resolve_one(self.middle, height)?,
            far: self.resolve_one(self.far, height)?,
        })
    }

    fn resolve_one(&self, ratio: BandRatio, height: usize) -> Result<ScanBand, LineError> {
        let start = ((ratio.start * height as f32).round() as usize).min(height.saturating_sub(1));
        let end = ((ratio.end * height as f32).round() as usize)
            .min(height)
            .max(start + 1);
        let step = ((end - start) / self.rows_per_band.max(1)).max(1);
        ScanBand::new(start, end, step)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Assumed vertical look-ahead span as a fraction of the image width.
    pub vertical_span_ratio: f32,
    /// Displacements below this fraction of the width count as straight.
    pub straight_ratio: f32,
    pub sharp_turn_degrees: f32,
    pub near_far_weight: f32,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            vertical_span_ratio: 0.35,
            straight_ratio: 0.05,
            sharp_turn_degrees: 30.0,
            near_far_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    pub alpha: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alpha: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub integral_limit: f32,
    pub output_limit: f32,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 1.5,
            ki: 0.02,
            kd: 0.8,
            integral_limit: 50.0,
            output_limit: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub lost_timeout_ms: u64,
    pub search_a_ms: u64,
    /// Total search time, measured from the start of the first search phase.
    pub search_b_ms: u64,
    /// Steering magnitude applied while searching.
    pub search_control: f32,
    pub first_search_direction: SearchDirection,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            lost_timeout_ms: 300,
            search_a_ms: 800,
            search_b_ms: 1500,
            search_control: 60.0,
            first_search_direction: SearchDirection::Right,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub base_speed: f32,
    pub max_speed: f32,
    /// Speed used while searching for a lost line.
    pub search_speed: f32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_speed: 60.0,
            max_speed: 100.0,
            search_speed: 35.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub frames_dir: String,
    pub frame_interval_ms: u64,
    pub extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            frames_dir: "frames".to_string(),
            frame_interval_ms: 33,
            extensions: ["png", "pgm", "jpg", "jpeg", "bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub save_overlays: bool,
    pub overlay_dir: String,
    pub telemetry_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_overlays: false,
            overlay_dir: "output/overlays".to_string(),
            telemetry_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "line_tracker=info".to_string(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LineError> {
        let invalid = |msg: String| Err(LineError::InvalidConfig(msg));

        let d = &self.detection;
        if d.min_line_width == 0 {
            return invalid("detection.min_line_width must be > 0".into());
        }
        if d.max_ideal_width < d.min_line_width {
            return invalid("detection.max_ideal_width must be >= min_line_width".into());
        }
        if d.bands.rows_per_band == 0 {
            return invalid("detection.bands.rows_per_band must be >= 1".into());
        }
        for (name, band) in [
            ("far", d.bands.far),
            ("middle", d.bands.middle),
            ("near", d.bands.near),
        ] {
            if !(0.0..=1.0).contains(&band.start)
                || !(0.0..=1.0).contains(&band.end)
                || band.start >= band.end
            {
                return invalid(format!(
                    "detection.bands.{name} must satisfy 0 <= start < end <= 1"
                ));
            }
        }

        let c = &self.curve;
        if !(0.3..=0.4).contains(&c.vertical_span_ratio) {
            return invalid("curve.vertical_span_ratio must be within [0.3, 0.4]".into());
        }
        if c.straight_ratio < 0.0 || c.sharp_turn_degrees <= 0.0 {
            return invalid("curve thresholds must be positive".into());
        }

        if !(0.3..=0.5).contains(&self.filter.alpha) {
            return invalid("filter.alpha must be within [0.3, 0.5]".into());
        }

        let p = &self.pid;
        if p.integral_limit <= 0.0 || p.output_limit <= 0.0 {
            return invalid("pid limits must be positive".into());
        }

        let r = &self.recovery;
        if !(r.lost_timeout_ms < r.search_a_ms && r.search_a_ms < r.search_b_ms) {
            return invalid(
                "recovery timeouts must satisfy lost_timeout_ms < search_a_ms < search_b_ms".into(),
            );
        }

        if self.drive.max_speed <= 0.0 {
            return invalid("drive.max_speed must be positive".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
detection:
  min_line_width: 6
  scan_mode: longest_run
pid:
  kp: 2.0
recovery:
  first_search_direction: left
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.detection.min_line_width, 6);
        assert_eq!(config.detection.scan_mode, ScanMode::LongestRun);
        assert_eq!(config.detection.max_ideal_width, 50);
        assert_eq!(config.pid.kp, 2.0);
        assert_eq!(config.pid.integral_limit, 50.0);
        assert_eq!(config.recovery.first_search_direction, SearchDirection::Left);
        assert_eq!(config.recovery.lost_timeout_ms, 300);
    }

    #[test]
    fn test_rejects_zero_min_width() {
        let yaml = "detection:\n  min_line_width: 0\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_alpha_out_of_range() {
        let mut config = Config::default();
        config.filter.alpha = 0.9;
        assert!(matches!(
            config.validate(),
            Err(LineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_unordered_recovery_timeouts() {
        let mut config = Config::default();
        config.recovery.search_b_ms = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_band_layout_thirds() {
        let bands = BandLayout::default().resolve(240).unwrap();
        assert_eq!(bands.far.start_row(), 0);
        assert_eq!(bands.far.end_row(), 80);
        assert_eq!(bands.middle.start_row(), 80);
        assert_eq!(bands.middle.end_row(), 160);
        assert_eq!(bands.near.start_row(), 160);
        assert_eq!(bands.near.end_row(), 240);
        assert_eq!(bands.near.row_step(), 10);
        assert_eq!(bands.near.row_count(240), 8);
    }

    #[test]
    fn test_band_layout_tiny_frame_keeps_step_positive() {
        let bands = BandLayout::default().resolve(3).unwrap();
        assert_eq!(bands.near.row_step(), 1);
        assert_eq!(bands.near.row_count(3), 1);
    }
}
