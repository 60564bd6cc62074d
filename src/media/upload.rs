use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;
use crate::media::{normalize, NormalizedMedia};

/// A request-scoped uploaded file on disk.
///
/// The backing file is removed when the guard is dropped, whichever way the
/// request ends.
#[derive(Debug)]
pub struct TempUpload {
    file: NamedTempFile,
    mime_type: String,
}

impl TempUpload {
    /// Create an empty upload file in `dir`, or the system temp dir.
    pub fn create(dir: Option<&Path>, mime_type: impl Into<String>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-");

        let file = match dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempfile_in(dir)?
            }
            None => builder.tempfile()?,
        };

        debug!(path = %file.path().display(), "Created upload file");
        Ok(Self {
            file,
            mime_type: mime_type.into(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Read the file back and encode it, releasing the file afterwards.
    pub async fn into_media(self) -> Result<NormalizedMedia> {
        let bytes = tokio::fs::read(self.path()).await?;
        Ok(normalize(bytes, &self.mime_type))
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        debug!(path = %self.file.path().display(), "Releasing upload file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_into_media_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = TempUpload::create(Some(dir.path()), "image/png").unwrap();
        tokio::fs::write(upload.path(), b"\x89PNG").await.unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());

        let media = upload.into_media().await.unwrap();
        assert_eq!(media.mime_type(), "image/png");
        assert_eq!(media.base64(), "iVBORw==");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_file_on_error_path() {
        let dir = tempfile::tempdir().unwrap();
        let upload = TempUpload::create(Some(dir.path()), "image/png").unwrap();
        let path = upload.path().to_path_buf();
        drop(upload);
        assert!(!path.exists());
    }

    #[test]
    fn test_create_makes_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads");
        let upload = TempUpload::create(Some(&nested), "").unwrap();
        assert!(upload.path().starts_with(&nested));
        assert_eq!(upload.mime_type(), "");
    }
}
