// src/pipeline/metrics.rs
//
// Counters and timings for the cycle loop. Cloning shares the same
// counters, so a telemetry reader can hold a copy while the loop runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub capture_failures: Arc<AtomicU64>,
    pub frames_with_line: Arc<AtomicU64>,
    pub sharp_turns: Arc<AtomicU64>,
    pub calibrations: Arc<AtomicU64>,
    pub calibration_failures: Arc<AtomicU64>,
    pub searches_started: Arc<AtomicU64>,
    pub recoveries: Arc<AtomicU64>,
    pub lost_events: Arc<AtomicU64>,
    pub detect_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            capture_failures: Arc::new(AtomicU64::new(0)),
            frames_with_line: Arc::new(AtomicU64::new(0)),
            sharp_turns: Arc::new(AtomicU64::new(0)),
            calibrations: Arc::new(AtomicU64::new(0)),
            calibration_failures: Arc::new(AtomicU64::new(0)),
            searches_started: Arc::new(AtomicU64::new(0)),
            recoveries: Arc::new(AtomicU64::new(0)),
            lost_events: Arc::new(AtomicU64::new(0)),
            detect_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    /// Frames that actually reached detection per second. Capture
    /// failures cost a cycle but are not counted.
    pub fn fps(&self) -> f64 {
        let captured = self
            .total_frames
            .load(Ordering::Relaxed)
            .saturating_sub(self.capture_failures.load(Ordering::Relaxed));
        per_second(captured, self.started_at.elapsed().as_secs_f64())
    }

    pub fn summary(&self) -> MetricsSummary {
        let total_frames = self.total_frames.load(Ordering::Relaxed);
        let frames_with_line = self.frames_with_line.load(Ordering::Relaxed);
        MetricsSummary {
            total_frames,
            fps: self.fps(),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            frames_with_line,
            detection_rate: if total_frames > 0 {
                frames_with_line as f64 / total_frames as f64
            } else {
                0.0
            },
            sharp_turns: self.sharp_turns.load(Ordering::Relaxed),
            calibrations: self.calibrations.load(Ordering::Relaxed),
            calibration_failures: self.calibration_failures.load(Ordering::Relaxed),
            searches_started: self.searches_started.load(Ordering::Relaxed),
            recoveries: self.recoveries.load(Ordering::Relaxed),
            lost_events: self.lost_events.load(Ordering::Relaxed),
            last_detect_us: self.detect_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

fn per_second(count: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.01 {
        count as f64 / elapsed_secs
    } else {
        0.0
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub capture_failures: u64,
    pub frames_with_line: u64,
    pub detection_rate: f64,
    pub sharp_turns: u64,
    pub calibrations: u64,
    pub calibration_failures: u64,
    pub searches_started: u64,
    pub recoveries: u64,
    pub lost_events: u64,
    pub last_detect_us: u64,
    pub elapsed_secs: f64,
}
