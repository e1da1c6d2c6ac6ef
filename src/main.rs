// src/main.rs

use anyhow::{Context, Result};
use line_tracker::config::Config;
use line_tracker::control::{Actuator, Clock, LoggingActuator, MonotonicClock, RecoveryPhase};
use line_tracker::frame_source::{DirectoryFrameSource, FrameSource};
use line_tracker::overlay::{render_overlay, save_overlay};
use line_tracker::pipeline::{FrameContext, LineFollower, PipelineEvent};
use line_tracker::types::BandSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("🤖 Line tracker starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Scan: min_width={} mode={:?} path={:?} | PID kp={} ki={} kd={}",
        config.detection.min_line_width,
        config.detection.scan_mode,
        config.detection.pixel_path,
        config.pid.kp,
        config.pid.ki,
        config.pid.kd
    );

    let mut source = DirectoryFrameSource::from_config(&config.input);
    if source.is_empty() {
        error!("No frames found in {}", config.input.frames_dir);
        return Ok(());
    }

    let mut follower = LineFollower::new(&config)?;
    let mut actuator = LoggingActuator::default();

    let mut telemetry = match &config.output.telemetry_path {
        Some(path) => {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create telemetry file {}", path))?;
            info!("💾 Telemetry will be written to: {}", path);
            Some(BufWriter::new(file))
        }
        None => None,
    };

    if config.output.save_overlays {
        std::fs::create_dir_all(&config.output.overlay_dir)?;
        info!("🖼  Overlays will be written to: {}", config.output.overlay_dir);
    }

    // A zero interval replays as fast as frames decode, timed by the wall clock.
    let wall_clock = MonotonicClock::new();
    let interval = Duration::from_millis(config.input.frame_interval_ms);
    let mut next_timestamp = Duration::ZERO;
    loop {
        let captured = match source.capture() {
            Ok(Some(buffer)) => Ok(buffer),
            Ok(None) => break,
            Err(e) => Err(e),
        };

        let ctx = match &captured {
            Ok(buffer) => {
                let now = if interval.is_zero() {
                    wall_clock.now()
                } else {
                    Duration::from_secs_f64(buffer.timestamp_ms / 1000.0)
                };
                next_timestamp = now + interval;
                let ctx = follower.run_cycle(Ok(buffer.as_frame()), now);

                if config.output.save_overlays {
                    if let Err(e) = write_overlay(&config, buffer, &ctx) {
                        warn!("Overlay for frame {} not saved: {:#}", ctx.frame_id, e);
                    }
                }
                ctx
            }
            Err(e) => {
                let now = if interval.is_zero() {
                    wall_clock.now()
                } else {
                    next_timestamp
                };
                next_timestamp = now + interval;
                follower.run_cycle(Err(e.clone()), now)
            }
        };

        actuator.apply(&ctx.command, ctx.motor)?;

        if let Some(writer) = telemetry.as_mut() {
            writeln!(writer, "{}", ctx.to_json()?)?;
        }

        for event in follower.drain_events() {
            log_event(&event);
        }

        if ctx.phase == RecoveryPhase::Lost && ctx.captured {
            // Replay has no operator to press reset; resume on the next frame.
            if let Some(path) = source.current_path() {
                warn!("Halted at {}, resetting", path.display());
            }
            follower.reset();
        }
    }

    if let Some(mut writer) = telemetry {
        writer.flush()?;
    }

    let summary = follower.metrics().summary();
    info!("\n📊 Final Report:");
    info!("  Total frames: {}", summary.total_frames);
    info!(
        "  Frames with line: {} ({:.1}%)",
        summary.frames_with_line,
        summary.detection_rate * 100.0
    );
    info!("  Capture failures: {}", summary.capture_failures);
    info!(
        "  Calibrations: {} ok, {} failed",
        summary.calibrations, summary.calibration_failures
    );
    info!("  Sharp turns: {}", summary.sharp_turns);
    info!(
        "  Searches: {} started, {} recovered, {} lost",
        summary.searches_started, summary.recoveries, summary.lost_events
    );
    info!("  Actuator commands: {}", actuator.commands());
    if follower.dropped_events() > 0 {
        warn!("  Events dropped: {}", follower.dropped_events());
    }
    info!("  Processing Speed: {:.1} FPS", summary.fps);

    Ok(())
}

fn write_overlay(
    config: &Config,
    buffer: &line_tracker::types::FrameBuffer,
    ctx: &FrameContext,
) -> Result<()> {
    let bands: BandSet = config.detection.bands.resolve(buffer.height)?;
    let image = render_overlay(&buffer.as_frame(), &ctx.detection, &bands);
    let path = Path::new(&config.output.overlay_dir).join(format!("frame_{:06}.png", ctx.frame_id));
    save_overlay(&image, &path)
}

fn log_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Calibrated { frame_id, state } => info!(
            "🎯 Frame {}: calibrated threshold={} polarity={:?}",
            frame_id, state.threshold, state.polarity
        ),
        PipelineEvent::CalibrationFailed {
            frame_id, reason, ..
        } => warn!("⚠️  Frame {}: calibration failed: {}", frame_id, reason),
        PipelineEvent::CaptureFailed { frame_id, reason } => {
            warn!("⚠️  Frame {}: capture failed: {}", frame_id, reason)
        }
        PipelineEvent::PhaseChanged {
            frame_id,
            timestamp_ms,
            from,
            to,
        } => info!(
            "🔀 Frame {} @ {:.0}ms: {} -> {}",
            frame_id,
            timestamp_ms,
            from.as_str(),
            to.as_str()
        ),
        PipelineEvent::SharpTurn {
            frame_id,
            angle_degrees,
            direction,
        } => info!(
            "🌀 Frame {}: sharp turn {:?} ({:.1}°)",
            frame_id, direction, angle_degrees
        ),
    }
}
