use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Metadata for a stored blob, as exposed to CV listings.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobMetadata {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Opaque-path blob storage collaborator. CVs are written once per upload and
/// read back by the download and listing endpoints; a production adapter
/// would implement this same trait over real object storage.
pub trait BlobStore: Send + Sync {
    fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), BlobError>;
    fn read(&self, path: &str) -> Result<Vec<u8>, BlobError>;
    fn exists(&self, path: &str) -> Result<bool, BlobError>;
    fn metadata(&self, path: &str) -> Result<BlobMetadata, BlobError>;
}

/// Blob store failures.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob not found")]
    NotFound,
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

struct BlobEntry {
    bytes: Vec<u8>,
    stored_at: DateTime<Utc>,
}

/// Mutex-guarded in-memory blob store.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, BlobEntry>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| BlobError::Unavailable("blob mutex poisoned".to_string()))?;
        blobs.insert(
            path.to_string(),
            BlobEntry {
                bytes,
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, BlobError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| BlobError::Unavailable("blob mutex poisoned".to_string()))?;
        blobs
            .get(path)
            .map(|entry| entry.bytes.clone())
            .ok_or(BlobError::NotFound)
    }

    fn exists(&self, path: &str) -> Result<bool, BlobError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| BlobError::Unavailable("blob mutex poisoned".to_string()))?;
        Ok(blobs.contains_key(path))
    }

    fn metadata(&self, path: &str) -> Result<BlobMetadata, BlobError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| BlobError::Unavailable("blob mutex poisoned".to_string()))?;
        let entry = blobs.get(path).ok_or(BlobError::NotFound)?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(BlobMetadata {
            filename: basename(path).to_string(),
            mime_type,
            size: entry.bytes.len() as u64,
            last_modified: entry.stored_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_read_round_trips() {
        let store = InMemoryBlobStore::new();
        store
            .put("cvs/dana.pdf", b"%PDF-1.4 sample".to_vec())
            .expect("put succeeds");
        let bytes = store.read("cvs/dana.pdf").expect("read succeeds");
        assert_eq!(bytes, b"%PDF-1.4 sample".to_vec());
        assert!(store.exists("cvs/dana.pdf").expect("exists succeeds"));
    }

    #[test]
    fn metadata_reports_name_mime_and_size() {
        let store = InMemoryBlobStore::new();
        store
            .put("cvs/dana.pdf", vec![0u8; 64])
            .expect("put succeeds");
        let metadata = store.metadata("cvs/dana.pdf").expect("metadata succeeds");
        assert_eq!(metadata.filename, "dana.pdf");
        assert_eq!(metadata.mime_type, "application/pdf");
        assert_eq!(metadata.size, 64);
    }

    #[test]
    fn missing_blob_is_not_found() {
        let store = InMemoryBlobStore::new();
        assert!(!store.exists("cvs/nobody.pdf").expect("exists succeeds"));
        match store.read("cvs/nobody.pdf") {
            Err(BlobError::NotFound) => {}
            other => panic!("expected not found, got {other:?}"),
        }
    }
}
