// src/overlay.rs
//
// Debug rendering. Always draws on a copy; the captured frame is never
// written to.

use crate::types::{BandSet, DetectionResult, Frame, RegionResult, ScanBand};
use anyhow::{Context, Result};
use image::{GrayImage, Luma};
use std::path::Path;

const BAND_MARK: Luma<u8> = Luma([128]);
const CENTER_MARK: Luma<u8> = Luma([64]);

/// Band boundaries as dashed rows, one tick per detected region, the
/// aggregate position as a full-height marker along the bottom band and
/// the frame center as a short stub at the bottom edge.
pub fn render_overlay(frame: &Frame, detection: &DetectionResult, bands: &BandSet) -> GrayImage {
    let (w, h) = (frame.width() as u32, frame.height() as u32);
    let mut out = GrayImage::new(w, h);
    if !frame.is_grayscale() || w == 0 || h == 0 {
        return out;
    }

    for y in 0..h {
        for (x, &v) in frame.row(y as usize).iter().enumerate() {
            out.put_pixel(x as u32, y, Luma([v]));
        }
    }

    for band in bands.iter() {
        draw_band_edges(&mut out, band);
    }

    let regions = [
        (&detection.regions.near, &bands.near),
        (&detection.regions.middle, &bands.middle),
        (&detection.regions.far, &bands.far),
    ];
    for (region, band) in regions {
        draw_region_tick(&mut out, region, band);
    }

    let center_x = w / 2;
    for y in h.saturating_sub(4)..h {
        out.put_pixel(center_x, y, CENTER_MARK);
    }

    if detection.detected {
        let x = column_for(detection.position, w);
        for y in bands.near.start_row() as u32..(bands.near.end_row() as u32).min(h) {
            let contrast = contrasting(out.get_pixel(x, y)[0]);
            out.put_pixel(x, y, contrast);
        }
    }

    out
}

pub fn save_overlay(image: &GrayImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    image
        .save(path)
        .with_context(|| format!("Failed to save overlay {}", path.display()))
}

fn draw_band_edges(out: &mut GrayImage, band: &ScanBand) {
    let (w, h) = out.dimensions();
    for y in [band.start_row() as u32, (band.end_row() as u32).saturating_sub(1)] {
        if y >= h {
            continue;
        }
        for x in (0..w).step_by(4) {
            out.put_pixel(x, y, BAND_MARK);
        }
    }
}

fn draw_region_tick(out: &mut GrayImage, region: &RegionResult, band: &ScanBand) {
    let Some(position) = region.position() else {
        return;
    };
    let (w, h) = out.dimensions();
    let x = column_for(position, w);
    let mid = ((band.start_row() + band.end_row()) / 2) as u32;
    for y in mid.saturating_sub(3)..(mid + 4).min(h) {
        for dx in [x.saturating_sub(1), x, (x + 1).min(w - 1)] {
            let contrast = contrasting(out.get_pixel(dx, y)[0]);
            out.put_pixel(dx, y, contrast);
        }
    }
}

fn column_for(position: f32, width: u32) -> u32 {
    let x = (position.clamp(0.0, 100.0) / 100.0 * width as f32) as u32;
    x.min(width - 1)
}

fn contrasting(v: u8) -> Luma<u8> {
    if v < 128 {
        Luma([255])
    } else {
        Luma([0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BandLayout;
    use crate::detection::LineDetector;
    use crate::types::CalibrationState;

    fn line_frame(w: usize, h: usize) -> Vec<u8> {
        let mut data = vec![230u8; w * h];
        for y in 0..h {
            for x in 30..44 {
                data[y * w + x] = 20;
            }
        }
        data
    }

    #[test]
    fn test_overlay_leaves_source_untouched() {
        let data = line_frame(80, 60);
        let before = data.clone();
        let frame = Frame::new(80, 60, &data).unwrap();
        let bands = BandLayout::default().resolve(60).unwrap();
        let detector = LineDetector::from_config(&crate::config::Config::default());
        let calibration = CalibrationState {
            threshold: 125,
            polarity: crate::types::Polarity::LineDarker,
        };
        let detection = detector.detect(&frame, &calibration, &bands);
        assert!(detection.detected);

        let image = render_overlay(&frame, &detection, &bands);
        assert_eq!(data, before);
        assert_eq!(image.dimensions(), (80, 60));
        assert_ne!(image.as_raw().as_slice(), data.as_slice());
    }

    #[test]
    fn test_overlay_marks_band_edges() {
        let data = vec![200u8; 40 * 30];
        let frame = Frame::new(40, 30, &data).unwrap();
        let bands = BandLayout::default().resolve(30).unwrap();
        let image = render_overlay(&frame, &DetectionResult::not_detected(), &bands);

        let y = bands.middle.start_row() as u32;
        assert_eq!(image.get_pixel(0, y)[0], 128);
        assert_eq!(image.get_pixel(1, y)[0], 200);
    }
}
