use crate::backend::{FileBackend, KeyValueBackend};
use crate::serializer::{AnnotationSerializer, JsonSerializer};
use crate::{AnnotationStore, StorageResult};
use async_trait::async_trait;
use marginalia_model::Annotation;
use std::sync::Arc;
use std::time::Duration;

/// [`AnnotationStore`] keeping one document's annotations under a single key.
pub struct KeyValueStore {
    backend: Arc<dyn KeyValueBackend>,
    key: String,
    serializer: Arc<dyn AnnotationSerializer>,
    debounce: Option<Duration>,
}

impl KeyValueStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            serializer: Arc::new(JsonSerializer::default()),
            debounce: None,
        }
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn AnnotationSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = Some(debounce);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl AnnotationStore for KeyValueStore {
    async fn load(&self) -> StorageResult<Vec<Annotation>> {
        let Some(raw) = self.backend.get_item(&self.key)? else {
            return Ok(Vec::new());
        };
        if raw.is_empty() {
            return Ok(Vec::new());
        }

        match self.serializer.deserialize(&raw) {
            Ok(annotations) => Ok(annotations),
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    %err,
                    "stored annotations are unreadable; starting empty"
                );
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, annotations: &[Annotation]) -> StorageResult<()> {
        let serialized = self.serializer.serialize(annotations)?;
        self.backend.set_item(&self.key, &serialized)
    }

    async fn clear(&self) -> StorageResult<()> {
        self.backend.remove_item(&self.key)
    }

    async fn has_data(&self) -> StorageResult<Option<bool>> {
        Ok(Some(self.backend.get_item(&self.key)?.is_some()))
    }

    fn debounce(&self) -> Option<Duration> {
        self.debounce
    }
}

/// Store used when no backend is available: nothing loads, nothing is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStore;

#[async_trait]
impl AnnotationStore for DisabledStore {
    async fn load(&self) -> StorageResult<Vec<Annotation>> {
        Ok(Vec::new())
    }

    async fn save(&self, _annotations: &[Annotation]) -> StorageResult<()> {
        Ok(())
    }
}

/// File-backed store in the platform data directory, or a [`DisabledStore`]
/// when that directory cannot be resolved.
pub fn default_store(key: impl Into<String>) -> Arc<dyn AnnotationStore> {
    default_store_with(key, Arc::new(JsonSerializer::default()))
}

/// [`default_store`] writing through `serializer`.
pub fn default_store_with(
    key: impl Into<String>,
    serializer: Arc<dyn AnnotationSerializer>,
) -> Arc<dyn AnnotationStore> {
    file_store_or_disabled(FileBackend::from_default_project(), key, serializer)
}

fn file_store_or_disabled(
    backend: StorageResult<FileBackend>,
    key: impl Into<String>,
    serializer: Arc<dyn AnnotationSerializer>,
) -> Arc<dyn AnnotationStore> {
    match backend {
        Ok(backend) => {
            Arc::new(KeyValueStore::new(Arc::new(backend), key).with_serializer(serializer))
        }
        Err(err) => {
            tracing::warn!(%err, "annotation storage unavailable; changes will not be persisted");
            Arc::new(DisabledStore)
        }
    }
}
