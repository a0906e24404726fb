//! Annotation id generation

use marginalia_model::AnnotationId;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// How the controller mints ids for new annotations.
#[derive(Clone, Default)]
pub enum IdStrategy {
    /// Random UUID v4 from the OS CSPRNG.
    #[default]
    Uuid,
    /// `<unix millis>-<random hex>`, for hosts without a CSPRNG.
    TimestampRandom,
    /// Caller-supplied generator, e.g. deterministic ids in tests.
    Custom(Arc<dyn Fn() -> AnnotationId + Send + Sync>),
}

impl IdStrategy {
    pub fn custom(generate: impl Fn() -> AnnotationId + Send + Sync + 'static) -> Self {
        IdStrategy::Custom(Arc::new(generate))
    }

    pub fn generate(&self) -> AnnotationId {
        match self {
            IdStrategy::Uuid => AnnotationId::new(uuid::Uuid::new_v4().to_string()),
            IdStrategy::TimestampRandom => timestamp_random_id(),
            IdStrategy::Custom(generate) => generate(),
        }
    }
}

impl fmt::Debug for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdStrategy::Uuid => f.write_str("Uuid"),
            IdStrategy::TimestampRandom => f.write_str("TimestampRandom"),
            IdStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

pub fn timestamp_random_id() -> AnnotationId {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let entropy: u64 = rand::thread_rng().gen();
    AnnotationId::new(format!("{millis}-{entropy:x}"))
}

static FALLBACK_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Composite id that cannot collide within a process: timestamp, random
/// suffix and a process-wide sequence number.
pub(crate) fn sequenced_id() -> AnnotationId {
    let sequence = FALLBACK_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AnnotationId::new(format!("{}-{sequence}", timestamp_random_id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_ids_parse_as_uuids() {
        let id = IdStrategy::Uuid.generate();
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn timestamp_ids_have_two_parts() {
        let id = IdStrategy::TimestampRandom.generate();
        let (millis, entropy) = id.as_str().split_once('-').expect("composite id");
        assert!(millis.parse::<u128>().is_ok());
        assert!(u64::from_str_radix(entropy, 16).is_ok());
    }

    #[test]
    fn custom_strategy_is_used() {
        let strategy = IdStrategy::custom(|| AnnotationId::new("fixed"));
        assert_eq!(strategy.generate().as_str(), "fixed");
    }

    #[test]
    fn sequenced_ids_are_distinct() {
        let ids: HashSet<_> = (0..1000).map(|_| sequenced_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
