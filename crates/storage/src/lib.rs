//! Annotation persistence
//!
//! Defines the store port the lifecycle controller writes through, the
//! serializer port with its versioned JSON implementation, and key/value
//! backed stores (in-memory and on-disk).

mod backend;
mod serializer;
mod store;

pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use serializer::{AnnotationSerializer, JsonSerializer, CURRENT_FORMAT_VERSION};
pub use store::{default_store, default_store_with, DisabledStore, KeyValueStore};

use async_trait::async_trait;
use marginalia_model::Annotation;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize annotations: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to deserialize annotations: {0}")]
    Deserialize(#[source] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent home of one document's annotations.
///
/// Implementations may finish immediately or suspend on real I/O; callers
/// always await. `clear`, `has_data` and `debounce` are optional and default
/// to "not supported".
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    async fn load(&self) -> StorageResult<Vec<Annotation>>;

    async fn save(&self, annotations: &[Annotation]) -> StorageResult<()>;

    async fn clear(&self) -> StorageResult<()> {
        Ok(())
    }

    /// `Ok(None)` when the store cannot tell without loading.
    async fn has_data(&self) -> StorageResult<Option<bool>> {
        Ok(None)
    }

    /// Override for the controller's write debounce.
    fn debounce(&self) -> Option<Duration> {
        None
    }
}

#[async_trait]
impl<S: AnnotationStore + ?Sized> AnnotationStore for Arc<S> {
    async fn load(&self) -> StorageResult<Vec<Annotation>> {
        (**self).load().await
    }

    async fn save(&self, annotations: &[Annotation]) -> StorageResult<()> {
        (**self).save(annotations).await
    }

    async fn clear(&self) -> StorageResult<()> {
        (**self).clear().await
    }

    async fn has_data(&self) -> StorageResult<Option<bool>> {
        (**self).has_data().await
    }

    fn debounce(&self) -> Option<Duration> {
        (**self).debounce()
    }
}
