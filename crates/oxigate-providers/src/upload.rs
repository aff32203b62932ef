//! Temporary audio uploads for transcription.
//!
//! An [`AudioUpload`] owns its file: it is deleted when the upload is
//! released by the dispatcher or, failing that, when the value is dropped
//! (early rejection, client disconnect, panic unwinding).

use std::io::Write;
use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, warn};

/// File name sent upstream for every uploaded clip.
pub const UPLOAD_FILE_NAME: &str = "audio.wav";
/// MIME type sent upstream for every uploaded clip.
pub const UPLOAD_MIME: &str = "audio/wav";

/// An audio clip spooled to a temporary file for the life of one request.
#[derive(Debug)]
pub struct AudioUpload {
    path: TempPath,
}

impl AudioUpload {
    /// Write `bytes` to a new temporary file in `dir` (system temp dir if `None`).
    pub fn persist(dir: Option<&Path>, bytes: &[u8]) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("oxigate-audio-").suffix(".wav");
        let mut file = match dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempfile_in(dir)?
            }
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        let path = file.into_temp_path();
        debug!(path = %path.display(), bytes = bytes.len(), "audio upload spooled");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the clip back for sending.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Delete the file now, logging (not failing) if that doesn't work.
    pub fn release(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => debug!(path = %shown, "audio upload released"),
            Err(e) => warn!(path = %shown, error = %e, "failed to remove audio upload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let upload = AudioUpload::persist(Some(dir.path()), b"RIFF....WAVE").unwrap();
        assert!(upload.path().starts_with(dir.path()));
        assert_eq!(std::fs::read(upload.path()).unwrap(), b"RIFF....WAVE");
    }

    #[test]
    fn test_release_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = AudioUpload::persist(Some(dir.path()), b"abc").unwrap();
        let path = upload.path().to_path_buf();
        upload.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = AudioUpload::persist(Some(dir.path()), b"abc").unwrap();
        let path = upload.path().to_path_buf();
        drop(upload);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_read_back() {
        let upload = AudioUpload::persist(None, b"hello").unwrap();
        assert_eq!(upload.read().await.unwrap(), b"hello");
    }
}
