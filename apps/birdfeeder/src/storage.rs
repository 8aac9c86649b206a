//! # Storage Module
//!
//! Writes captures to the storage directory as `img-<tag>.jpg`, with the
//! top label in EXIF `ImageDescription`.

use crate::error::AppError;
use crate::source::Frame;
use birdfeeder_core::exif;
use birdfeeder_core::{CaptureRecord, CaptureTag, Classification, SaveReason, capture_file_name};
use std::path::{Path, PathBuf};
use tracing::info;

/// File extension for captures.
const CAPTURE_EXT: &str = "jpg";

/// Capture directory.
#[derive(Debug, Clone)]
pub struct CaptureStore {
    dir: PathBuf,
}

impl CaptureStore {
    /// Open (creating if needed) the capture directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `frame` and log what was seen in it.
    pub async fn save(
        &self,
        frame: &Frame,
        classification: &Classification,
        tag: CaptureTag,
        reason: SaveReason,
    ) -> Result<CaptureRecord, AppError> {
        let description = classification
            .top()
            .map(|c| c.label.as_str())
            .unwrap_or_default();
        let tagged = exif::embed_description(&frame.jpeg, description)?;

        let file = capture_file_name(tag, CAPTURE_EXT);
        let path = self.dir.join(&file);
        tokio::fs::write(&path, tagged).await?;

        println!("Frame saved as: {}", path.display());
        info!(
            tag = %tag,
            file = %file,
            reason = %reason,
            results = %classification.summary(),
            "frame saved"
        );

        Ok(CaptureRecord {
            tag,
            file,
            reason,
            classes: classification.classes.clone(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use birdfeeder_core::{Class, Score};

    fn frame() -> Frame {
        Frame::new(vec![0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0x11, 0xFF, 0xD9])
    }

    #[tokio::test]
    async fn save_writes_tagged_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::open(dir.path().join("captures")).unwrap();
        let classification = Classification {
            classes: vec![Class::new("house finch", Score::from_bp(8800))],
        };

        let record = store
            .save(&frame(), &classification, CaptureTag(4321), SaveReason::Detection)
            .await
            .unwrap();

        assert_eq!(record.file, "img-0000004321.jpg");
        let written = std::fs::read(store.dir().join(&record.file)).unwrap();
        assert_eq!(
            exif::read_description(&written).as_deref(),
            Some("house finch")
        );
    }

    #[tokio::test]
    async fn save_rejects_non_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::open(dir.path()).unwrap();
        let result = store
            .save(
                &Frame::new(b"not a jpeg".to_vec()),
                &Classification::default(),
                CaptureTag(1),
                SaveReason::TrainingDifference,
            )
            .await;
        assert!(matches!(result, Err(AppError::Core(_))));
    }
}
