// src/detection/scanner.rs

use super::mask::LineMask;
use crate::types::{RegionResult, RowScan, ScanBand};
use serde::{Deserialize, Serialize};

/// How line pixels within one row are turned into an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// First to last line pixel. Disjoint patches in a row merge into one
    /// wide interval.
    FirstLast,
    /// Longest contiguous run of line pixels; earliest run wins ties.
    LongestRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParams {
    pub min_line_width: usize,
    pub max_ideal_width: usize,
    pub mode: ScanMode,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            min_line_width: 10,
            max_ideal_width: 50,
            mode: ScanMode::FirstLast,
        }
    }
}

pub fn scan_row<M: LineMask>(mask: &M, y: usize, mode: ScanMode) -> RowScan {
    match mode {
        ScanMode::FirstLast => scan_first_last(mask, y),
        ScanMode::LongestRun => scan_longest_run(mask, y),
    }
}

fn scan_first_last<M: LineMask>(mask: &M, y: usize) -> RowScan {
    let mut scan = RowScan::empty();
    for x in 0..mask.width() {
        if mask.is_line(x, y) {
            if !scan.found {
                scan.found = true;
                scan.start = x;
            }
            scan.end = x;
        }
    }
    scan
}

fn scan_longest_run<M: LineMask>(mask: &M, y: usize) -> RowScan {
    fn close_run(start: usize, end: usize, best: &mut RowScan) {
        if !best.found || end - start + 1 > best.width() {
            *best = RowScan {
                found: true,
                start,
                end,
            };
        }
    }

    let mut best = RowScan::empty();
    let mut run_start: Option<usize> = None;

    for x in 0..mask.width() {
        match (mask.is_line(x, y), run_start) {
            (true, None) => run_start = Some(x),
            (false, Some(start)) => {
                close_run(start, x - 1, &mut best);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        close_run(start, mask.width() - 1, &mut best);
    }

    best
}

/// Aggregates every valid row of `band` into one region result.
pub fn scan_region<M: LineMask>(mask: &M, band: &ScanBand, params: &ScanParams) -> RegionResult {
    let width = mask.width();
    let mut rows_scanned = 0usize;
    let mut sample_count = 0usize;
    let mut position_sum = 0.0f32;
    let mut width_sum = 0.0f32;

    if width == 0 {
        return RegionResult::default();
    }

    for y in band.rows(mask.height()) {
        rows_scanned += 1;
        let row = scan_row(mask, y, params.mode);
        if !row.is_valid(params.min_line_width) {
            continue;
        }
        position_sum += 100.0 * row.center() / width as f32;
        width_sum += row.width() as f32;
        sample_count += 1;
    }

    if sample_count == 0 {
        return RegionResult {
            rows_scanned,
            ..RegionResult::default()
        };
    }

    RegionResult {
        detected: true,
        position: (position_sum / sample_count as f32).clamp(0.0, 100.0),
        width: width_sum / sample_count as f32,
        sample_count,
        rows_scanned,
    }
}
