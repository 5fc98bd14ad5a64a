use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::info;

use crate::errors::BackendError;

/// Receives upload progress as a percentage in `0..=100`.
/// Progress is best-effort feedback, never a completion signal.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Handle to an object that has been written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        progress: Option<ProgressFn>,
    ) -> Result<StoredObject, BackendError>;

    fn public_url(&self, object: &StoredObject) -> String;
}

/// S3 (or MinIO) bucket storage. The SDK offers no byte-level progress for a
/// single `PutObject`, so progress jumps from 0 to 100.
pub struct S3ObjectStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStorage {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        progress: Option<ProgressFn>,
    ) -> Result<StoredObject, BackendError> {
        let size_bytes = bytes.len() as u64;
        if let Some(report) = &progress {
            report(0);
        }

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(map_s3_error)?;

        if let Some(report) = &progress {
            report(100);
        }
        info!("Uploaded s3://{}/{} ({size_bytes} bytes)", self.bucket, key);

        Ok(StoredObject {
            key: key.to_string(),
            size_bytes,
        })
    }

    fn public_url(&self, object: &StoredObject) -> String {
        format!("{}/{}", self.public_base_url, object.key)
    }
}

fn map_s3_error<E, R>(e: SdkError<E, R>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&e).to_string();
    match &e {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            BackendError::NetworkFailure(detail)
        }
        _ if e.as_service_error().and_then(|s| s.code()) == Some("AccessDenied") => {
            BackendError::PermissionDenied
        }
        _ => BackendError::Unknown(detail),
    }
}

const MEMORY_CHUNK_BYTES: usize = 64 * 1024;

/// Object storage kept in process memory, reporting progress per 64 KiB chunk.
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        _content_type: &str,
        progress: Option<ProgressFn>,
    ) -> Result<StoredObject, BackendError> {
        let total = bytes.len();
        if let Some(report) = &progress {
            report(0);
            let mut sent = 0;
            while sent < total {
                sent = (sent + MEMORY_CHUNK_BYTES).min(total);
                report((sent * 100 / total) as u8);
            }
            if total == 0 {
                report(100);
            }
        }
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(StoredObject {
            key: key.to_string(),
            size_bytes: total as u64,
        })
    }

    fn public_url(&self, object: &StoredObject) -> String {
        format!("memory://{}", object.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_memory_upload_reports_monotonic_progress() {
        let storage = MemoryObjectStorage::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |pct| sink.lock().unwrap().push(pct));

        let bytes = Bytes::from(vec![7u8; 200 * 1024]);
        let object = storage
            .upload("uploads/a/b.pdf", bytes.clone(), "application/pdf", Some(progress))
            .await
            .unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(object.size_bytes, 200 * 1024);
        assert_eq!(storage.get("uploads/a/b.pdf").await, Some(bytes));
        assert_eq!(storage.public_url(&object), "memory://uploads/a/b.pdf");
    }

    #[tokio::test]
    async fn test_memory_upload_of_empty_file_completes() {
        let storage = MemoryObjectStorage::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |pct| sink.lock().unwrap().push(pct));
        storage
            .upload("k", Bytes::new(), "image/png", Some(progress))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 100]);
    }
}
