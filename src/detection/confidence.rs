// src/detection/confidence.rs
//
// Trust score 0..100: up to 70 for how consistently rows found the line,
// up to 30 for a plausible line width.

use super::scanner::ScanParams;

const CONSISTENCY_MAX: u32 = 70;
const WIDTH_IDEAL_SCORE: u32 = 30;
const WIDTH_OVERWIDE_SCORE: u32 = 15;

pub fn consistency_score(sample_count: usize, rows_scanned: usize) -> u32 {
    if rows_scanned == 0 {
        return 0;
    }
    ((CONSISTENCY_MAX as usize * sample_count / rows_scanned) as u32).min(CONSISTENCY_MAX)
}

pub fn width_score(width: f32, params: &ScanParams) -> u32 {
    if width >= params.min_line_width as f32 && width <= params.max_ideal_width as f32 {
        WIDTH_IDEAL_SCORE
    } else if width > params.max_ideal_width as f32 {
        // Over-wide: probably a shadow or floor marking.
        WIDTH_OVERWIDE_SCORE
    } else {
        0
    }
}

pub fn confidence(width: f32, sample_count: usize, rows_scanned: usize, params: &ScanParams) -> u8 {
    let total = consistency_score(sample_count, rows_scanned) + width_score(width, params);
    total.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_consistency_ideal_width() {
        assert_eq!(confidence(20.0, 8, 8, &ScanParams::default()), 100);
    }

    #[test]
    fn test_overwide_line_scores_half() {
        assert_eq!(width_score(80.0, &ScanParams::default()), 15);
        assert_eq!(width_score(5.0, &ScanParams::default()), 0);
        assert_eq!(confidence(80.0, 4, 8, &ScanParams::default()), 35 + 15);
    }

    #[test]
    fn test_no_rows_scanned() {
        assert_eq!(consistency_score(0, 0), 0);
    }

    #[test]
    fn test_consistency_capped() {
        assert_eq!(consistency_score(12, 8), 70);
    }

    #[test]
    fn test_monotonic_in_sample_count() {
        let params = ScanParams::default();
        for rows in 1..=24 {
            let mut last = 0;
            for samples in 0..=rows {
                let c = confidence(25.0, samples, rows, &params);
                assert!(c >= last, "rows={} samples={}", rows, samples);
                assert!(c <= 100);
                last = c;
            }
        }
    }
}
