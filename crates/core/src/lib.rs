//! Marginalia Core Library
//!
//! Annotation lifecycle for a document viewer: the authoritative collection,
//! race-safe hydration from a document's store and debounced write-back.

pub mod config;
pub mod controller;
pub mod error;
pub mod id;
pub mod logging;

pub use config::{ControllerConfig, DEFAULT_DEBOUNCE};
pub use controller::{
    AnnotationController, AnnotationHandle, ChangeObserver, ControllerBuilder, DocumentSource,
    ErrorObserver, Snapshot, StorePhase,
};
pub use error::{ConfigError, ControllerError, ControllerResult, PersistenceOp};
pub use id::{timestamp_random_id, IdStrategy};

pub use marginalia_model as model;
pub use marginalia_storage as storage;
