// src/frame_source.rs
//
// Frame acquisition for the host build: replays a directory of still
// images as if they came off the camera at a fixed interval.

use crate::config::InputConfig;
use crate::error::LineError;
use crate::types::FrameBuffer;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub trait FrameSource {
    /// `Ok(None)` once the source is exhausted. A single unreadable frame
    /// is an `Err` and the source keeps going.
    fn capture(&mut self) -> Result<Option<FrameBuffer>, LineError>;
}

pub fn find_frame_files<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Vec<PathBuf> {
    let mut frames: Vec<PathBuf> = WalkDir::new(dir.as_ref())
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
                .unwrap_or(false)
        })
        .collect();

    frames.sort();
    info!(
        "Found {} frame files in {}",
        frames.len(),
        dir.as_ref().display()
    );
    frames
}

pub struct DirectoryFrameSource {
    files: Vec<PathBuf>,
    next: usize,
    interval_ms: f64,
}

impl DirectoryFrameSource {
    pub fn new(files: Vec<PathBuf>, interval_ms: u64) -> Self {
        Self {
            files,
            next: 0,
            interval_ms: interval_ms as f64,
        }
    }

    pub fn from_config(config: &InputConfig) -> Self {
        let files = find_frame_files(&config.frames_dir, &config.extensions);
        Self::new(files, config.frame_interval_ms)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Path of the frame the last `capture` call read.
    pub fn current_path(&self) -> Option<&Path> {
        self.next
            .checked_sub(1)
            .and_then(|i| self.files.get(i))
            .map(PathBuf::as_path)
    }
}

impl FrameSource for DirectoryFrameSource {
    fn capture(&mut self) -> Result<Option<FrameBuffer>, LineError> {
        let Some(path) = self.files.get(self.next) else {
            return Ok(None);
        };
        let timestamp_ms = self.next as f64 * self.interval_ms;
        self.next += 1;

        let image = image::open(path)
            .map_err(|e| LineError::CaptureUnavailable(format!("{}: {e}", path.display())))?
            .into_luma8();
        let (width, height) = (image.width() as usize, image.height() as usize);
        debug!("Decoded {} ({}x{})", path.display(), width, height);

        Ok(Some(FrameBuffer::grayscale(
            width,
            height,
            image.into_raw(),
            timestamp_ms,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("line-tracker-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn extensions() -> Vec<String> {
        InputConfig::default().extensions
    }

    #[test]
    fn test_replays_frames_in_name_order() {
        let dir = scratch_dir("replay");
        GrayImage::from_pixel(8, 6, Luma([10])).save(dir.join("b.png")).unwrap();
        GrayImage::from_pixel(8, 6, Luma([200])).save(dir.join("a.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut source = DirectoryFrameSource::new(find_frame_files(&dir, &extensions()), 40);
        assert_eq!(source.len(), 2);

        let first = source.capture().unwrap().unwrap();
        assert_eq!((first.width, first.height), (8, 6));
        assert_eq!(first.data[0], 200);
        assert_eq!(first.timestamp_ms, 0.0);
        assert!(source.current_path().unwrap().ends_with("a.png"));

        let second = source.capture().unwrap().unwrap();
        assert_eq!(second.data[0], 10);
        assert_eq!(second.timestamp_ms, 40.0);

        assert!(source.capture().unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_frame_is_capture_error() {
        let dir = scratch_dir("corrupt");
        std::fs::write(dir.join("broken.png"), b"definitely not png").unwrap();
        GrayImage::from_pixel(4, 4, Luma([0])).save(dir.join("ok.png")).unwrap();

        let mut source = DirectoryFrameSource::new(find_frame_files(&dir, &extensions()), 33);
        assert!(matches!(
            source.capture(),
            Err(LineError::CaptureUnavailable(_))
        ));
        // The source moves on past the bad file.
        assert!(source.capture().unwrap().is_some());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
