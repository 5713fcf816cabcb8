use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;

use crate::document::Document;
use crate::error::{IngestError, Result};

/// Byte-level progress callback. Implementations must report monotonically
/// non-decreasing percentages and finish at 100.
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub path: String,
    pub url: Option<String>,
}

/// The storage collaborator the raw document is streamed to before
/// extraction begins.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    async fn upload(
        &self,
        document: &Document,
        owner_id: &str,
        on_progress: ProgressFn<'_>,
    ) -> Result<StoredDocument>;
}

/// Filesystem-backed storage: one directory per owner, chunked writes with
/// progress reporting, numeric suffixes on filename collisions.
pub struct LocalStorage {
    root: PathBuf,
    chunk_size: usize,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: 64 * 1024,
        }
    }

    #[cfg(test)]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn available_path(dir: &Path, name: &str) -> PathBuf {
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }

        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), Some(ext.to_string())),
            _ => (name.to_string(), None),
        };
        let mut counter = 2;
        loop {
            let next = match &ext {
                Some(ext) => format!("{stem}_{counter}.{ext}"),
                None => format!("{stem}_{counter}"),
            };
            let candidate = dir.join(&next);
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[async_trait]
impl DocumentStorage for LocalStorage {
    async fn upload(
        &self,
        document: &Document,
        owner_id: &str,
        on_progress: ProgressFn<'_>,
    ) -> Result<StoredDocument> {
        let dir = self.root.join(owner_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| IngestError::UploadFailed(e.to_string()))?;

        let target = Self::available_path(&dir, &document.name);
        let mut file = tokio::fs::File::create(&target)
            .await
            .map_err(|e| IngestError::UploadFailed(e.to_string()))?;

        let total = document.bytes.len();
        let mut written = 0usize;
        on_progress(0);
        for chunk in document.bytes.chunks(self.chunk_size) {
            file.write_all(chunk)
                .await
                .map_err(|e| IngestError::UploadFailed(e.to_string()))?;
            written += chunk.len();
            // written only grows, so the reported percentage never decreases
            let percent = if total == 0 {
                100
            } else {
                (written * 100 / total) as u8
            };
            on_progress(percent);
        }
        file.flush()
            .await
            .map_err(|e| IngestError::UploadFailed(e.to_string()))?;
        on_progress(100);

        debug!("stored {} ({} bytes) at {}", document.name, total, target.display());
        Ok(StoredDocument {
            path: target.display().to_string(),
            url: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn doc(name: &str, len: usize) -> Document {
        Document::new(name, "text/plain", vec![b'x'; len])
    }

    #[tokio::test]
    async fn test_upload_writes_file_and_reports_monotonic_progress() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).with_chunk_size(100);

        let seen = Mutex::new(Vec::new());
        let record = |pct: u8| seen.lock().unwrap().push(pct);

        let stored = storage
            .upload(&doc("statement.txt", 350), "consultant-1", &record)
            .await
            .unwrap();

        let written = std::fs::read(&stored.path).unwrap();
        assert_eq!(written.len(), 350);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen.last().unwrap(), 100);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {seen:?}");
    }

    #[tokio::test]
    async fn test_colliding_names_get_numeric_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let noop = |_: u8| {};

        let first = storage
            .upload(&doc("statement.pdf", 10), "consultant-1", &noop)
            .await
            .unwrap();
        let second = storage
            .upload(&doc("statement.pdf", 10), "consultant-1", &noop)
            .await
            .unwrap();

        assert!(first.path.ends_with("statement.pdf"));
        assert!(second.path.ends_with("statement_2.pdf"));
    }

    #[tokio::test]
    async fn test_empty_document_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let seen = Mutex::new(Vec::new());
        let record = |pct: u8| seen.lock().unwrap().push(pct);

        storage
            .upload(&doc("empty.txt", 0), "consultant-1", &record)
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap().last().unwrap(), 100);
    }
}
