//! Annotation lifecycle controller
//!
//! Owns the authoritative annotation collection for the open document, hydrates
//! it from the document's store and writes changes back after a quiet period.
//!
//! Hydration for a document captures a cancellation token and a generation
//! number; opening another document cancels the token, so a load that resolves
//! late is discarded instead of overwriting the newer document. Writes are
//! suppressed until hydration finishes, and a single debounced save task is
//! kept per controller. The save snapshots the collection when its timer fires,
//! not when it was scheduled, so bursts of edits produce one write of the final
//! state. Once captured, a snapshot is written to the document it was taken
//! from even if another document has been opened since.

use crate::config::ControllerConfig;
use crate::error::{ControllerError, ControllerResult, PersistenceOp};
use crate::id::{sequenced_id, IdStrategy};
use marginalia_model::{
    Annotation, AnnotationId, CommentPatch, ContentPatch, NewAnnotation, PositionPatch,
};
use marginalia_scheduler::{CancellationToken, Cancelled, Debouncer};
use marginalia_storage::{AnnotationStore, StorageError};
use parking_lot::{Mutex, MutexGuard, ReentrantMutex};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

/// Attempts with the configured id strategy before falling back to sequenced ids.
const MAX_ID_ATTEMPTS: usize = 8;

/// Read-only view of the collection, newest first.
pub type Snapshot = Arc<Vec<Annotation>>;

pub type ChangeObserver = Arc<dyn Fn(&[Annotation]) + Send + Sync>;
pub type ErrorObserver = Arc<dyn Fn(&ControllerError) + Send + Sync>;

/// Persistence lifecycle of the open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePhase {
    /// No document has been opened yet.
    Uninitialized,
    /// Waiting on the store; changes are kept in memory only.
    Hydrating,
    /// Store contents applied; changes are written back.
    Hydrated,
}

/// A document identity together with where its annotations live.
pub struct DocumentSource {
    pub key: String,
    pub store: Arc<dyn AnnotationStore>,
    /// Shown while hydrating and kept when the store reports no data.
    pub initial: Vec<Annotation>,
}

impl DocumentSource {
    pub fn new(key: impl Into<String>, store: Arc<dyn AnnotationStore>) -> Self {
        Self { key: key.into(), store, initial: Vec::new() }
    }

    pub fn with_initial(mut self, initial: Vec<Annotation>) -> Self {
        self.initial = initial;
        self
    }
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentSource")
            .field("key", &self.key)
            .field("initial", &self.initial.len())
            .finish_non_exhaustive()
    }
}

struct Binding {
    key: String,
    store: Arc<dyn AnnotationStore>,
}

struct State {
    annotations: Snapshot,
    phase: StorePhase,
    binding: Option<Binding>,
    generation: u64,
    hydration: CancellationToken,
    saves: Debouncer,
    /// A change was made after the last captured write.
    unsaved: bool,
}

/// A write that must happen immediately, detached from the debounce.
struct PendingWrite {
    key: String,
    store: Arc<dyn AnnotationStore>,
    annotations: Snapshot,
}

impl State {
    fn index_of(&self, id: &AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|annotation| &annotation.id == id)
    }

    /// Cancel the debounced save and return it as an immediate write, if a
    /// change has not been captured by a write yet.
    fn take_pending_write(&mut self) -> Option<PendingWrite> {
        self.saves.cancel();
        self.capture_write()
    }

    /// Snapshot the collection for its document and mark it as saved.
    fn capture_write(&mut self) -> Option<PendingWrite> {
        if !self.unsaved || self.phase != StorePhase::Hydrated {
            return None;
        }
        let binding = self.binding.as_ref()?;
        let pending = PendingWrite {
            key: binding.key.clone(),
            store: Arc::clone(&binding.store),
            annotations: Arc::clone(&self.annotations),
        };
        self.unsaved = false;
        Some(pending)
    }
}

struct Shared {
    state: Mutex<State>,
    /// Serializes change notifications so observers see them in call order.
    /// Reentrant so observers may mutate the collection.
    notify_order: ReentrantMutex<()>,
    /// Serializes store calls in the order they were queued.
    write_gate: tokio::sync::Mutex<()>,
    phase_tx: watch::Sender<StorePhase>,
    config: ControllerConfig,
    ids: IdStrategy,
    on_change: Option<ChangeObserver>,
    on_error: Option<ErrorObserver>,
}

pub struct ControllerBuilder {
    config: ControllerConfig,
    ids: IdStrategy,
    on_change: Option<ChangeObserver>,
    on_error: Option<ErrorObserver>,
}

impl ControllerBuilder {
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_id_strategy(mut self, ids: IdStrategy) -> Self {
        self.ids = ids;
        self
    }

    /// Called with the full collection after every change and every hydration.
    pub fn on_change(mut self, observer: impl Fn(&[Annotation]) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(observer));
        self
    }

    /// Called when a store call fails. The in-memory collection is unaffected.
    pub fn on_persistence_error(
        mut self,
        observer: impl Fn(&ControllerError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(observer));
        self
    }

    pub fn build(self) -> AnnotationController {
        let (phase_tx, _) = watch::channel(StorePhase::Uninitialized);
        let shared = Shared {
            state: Mutex::new(State {
                annotations: Arc::new(Vec::new()),
                phase: StorePhase::Uninitialized,
                binding: None,
                generation: 0,
                hydration: CancellationToken::new(),
                saves: Debouncer::new(),
                unsaved: false,
            }),
            notify_order: ReentrantMutex::new(()),
            write_gate: tokio::sync::Mutex::new(()),
            phase_tx,
            config: self.config,
            ids: self.ids,
            on_change: self.on_change,
            on_error: self.on_error,
        };
        AnnotationController { shared: Arc::new(shared) }
    }
}

/// Owner of the annotation collection.
///
/// Spawns hydration and save tasks on the ambient tokio runtime, so documents
/// must be opened from within one.
pub struct AnnotationController {
    shared: Arc<Shared>,
}

impl AnnotationController {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder {
            config: ControllerConfig::default(),
            ids: IdStrategy::default(),
            on_change: None,
            on_error: None,
        }
    }

    pub fn new(config: ControllerConfig) -> Self {
        Self::builder().with_config(config).build()
    }

    /// CRUD handle for consumers; it stops working once the controller drops.
    pub fn handle(&self) -> AnnotationHandle {
        AnnotationHandle { shared: Arc::downgrade(&self.shared) }
    }

    /// Switch to a document and hydrate its annotations.
    ///
    /// The collection is reset to `source.initial` right away. Any hydration
    /// still running for the previous document is cancelled, and a debounced
    /// write still waiting for it is issued immediately against its own store.
    pub fn open_document(&self, source: DocumentSource) {
        self.shared.open_document(source);
    }

    pub fn phase(&self) -> StorePhase {
        self.shared.state.lock().phase
    }

    pub fn document_key(&self) -> Option<String> {
        self.shared.state.lock().binding.as_ref().map(|binding| binding.key.clone())
    }

    /// Resolves once the current document has finished hydrating.
    pub async fn wait_until_hydrated(&self) {
        let mut phase = self.shared.phase_tx.subscribe();
        let _ = phase.wait_for(|phase| *phase == StorePhase::Hydrated).await;
    }

    pub fn annotations(&self) -> Snapshot {
        Arc::clone(&self.shared.state.lock().annotations)
    }

    pub fn get(&self, id: &AnnotationId) -> Option<Annotation> {
        self.shared.state.lock().annotations.iter().find(|annotation| &annotation.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_annotation(&self, draft: NewAnnotation) -> Annotation {
        self.shared.add_annotation(draft)
    }

    /// Merge position and content changes. Returns `false` for unknown ids.
    pub fn update_annotation(
        &self,
        id: &AnnotationId,
        position: PositionPatch,
        content: ContentPatch,
    ) -> bool {
        self.shared.update_annotation(id, position, content)
    }

    /// Merge comment changes. Returns `false` for unknown ids.
    pub fn update_comment(&self, id: &AnnotationId, comment: CommentPatch) -> bool {
        self.shared.update_comment(id, comment)
    }

    pub fn remove_annotation(&self, id: &AnnotationId) -> Option<Annotation> {
        self.shared.remove_annotation(id)
    }

    pub fn replace_all(&self, annotations: Vec<Annotation>) {
        self.shared.replace_all(annotations);
    }

    /// Write any waiting change now and wait for in-flight writes.
    pub async fn flush(&self) {
        let pending = self.shared.state.lock().take_pending_write();
        match pending {
            Some(pending) => self.shared.write_snapshot(pending).await,
            None => drop(self.shared.write_gate.lock().await),
        }
    }

    /// Empty the collection and erase the open document's stored annotations.
    ///
    /// The collection is emptied before the store is touched, so a document
    /// opened while the erase is queued keeps what it hydrated. A hydration
    /// still running for the cleared document is abandoned. Writes captured
    /// earlier land before the erase; later changes land after it.
    pub async fn clear_document(&self) {
        let Some((key, store)) = self.shared.reset_collection() else {
            return;
        };

        let _gate = self.shared.write_gate.lock().await;
        tracing::debug!(document = %key, "clearing stored annotations");
        if let Err(source) = store.clear().await {
            self.shared.report(ControllerError::Persistence {
                op: PersistenceOp::Clear,
                document: key,
                source,
            });
        }
    }
}

impl fmt::Debug for AnnotationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("AnnotationController")
            .field("phase", &state.phase)
            .field("generation", &state.generation)
            .field("annotations", &state.annotations.len())
            .finish()
    }
}

impl Drop for AnnotationController {
    fn drop(&mut self) {
        let pending = {
            let mut state = self.shared.state.lock();
            state.hydration.cancel();
            state.take_pending_write()
        };

        let Some(pending) = pending else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let shared = Arc::clone(&self.shared);
                runtime.spawn(async move { shared.write_snapshot(pending).await });
            }
            Err(_) => {
                tracing::warn!(
                    document = %pending.key,
                    "controller dropped outside a runtime; pending changes were not saved"
                );
            }
        }
    }
}

/// Weak CRUD handle handed to consumers.
#[derive(Clone)]
pub struct AnnotationHandle {
    shared: Weak<Shared>,
}

impl AnnotationHandle {
    fn shared(&self) -> ControllerResult<Arc<Shared>> {
        self.shared.upgrade().ok_or(ControllerError::Detached)
    }

    pub fn is_attached(&self) -> bool {
        self.shared.strong_count() > 0
    }

    pub fn annotations(&self) -> ControllerResult<Snapshot> {
        Ok(Arc::clone(&self.shared()?.state.lock().annotations))
    }

    pub fn add_annotation(&self, draft: NewAnnotation) -> ControllerResult<Annotation> {
        Ok(self.shared()?.add_annotation(draft))
    }

    pub fn update_annotation(
        &self,
        id: &AnnotationId,
        position: PositionPatch,
        content: ContentPatch,
    ) -> ControllerResult<bool> {
        Ok(self.shared()?.update_annotation(id, position, content))
    }

    pub fn update_comment(
        &self,
        id: &AnnotationId,
        comment: CommentPatch,
    ) -> ControllerResult<bool> {
        Ok(self.shared()?.update_comment(id, comment))
    }

    pub fn remove_annotation(&self, id: &AnnotationId) -> ControllerResult<Option<Annotation>> {
        Ok(self.shared()?.remove_annotation(id))
    }

    pub fn replace_all(&self, annotations: Vec<Annotation>) -> ControllerResult<()> {
        self.shared()?.replace_all(annotations);
        Ok(())
    }
}

impl fmt::Debug for AnnotationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationHandle").field("attached", &self.is_attached()).finish()
    }
}

enum FetchError {
    Superseded,
    Store { op: PersistenceOp, source: StorageError },
}

impl From<Cancelled> for FetchError {
    fn from(_: Cancelled) -> Self {
        FetchError::Superseded
    }
}

/// `None` when the store reported that it holds nothing for the document.
async fn fetch(
    store: &dyn AnnotationStore,
    token: &CancellationToken,
) -> Result<Option<Vec<Annotation>>, FetchError> {
    let has_data = store
        .has_data()
        .await
        .map_err(|source| FetchError::Store { op: PersistenceOp::HasData, source })?;
    token.checkpoint()?;
    if has_data == Some(false) {
        return Ok(None);
    }

    let loaded = store
        .load()
        .await
        .map_err(|source| FetchError::Store { op: PersistenceOp::Load, source })?;
    token.checkpoint()?;
    Ok(Some(loaded))
}

impl Shared {
    fn open_document(self: &Arc<Self>, source: DocumentSource) {
        let DocumentSource { key, store, initial } = source;
        let _order = self.notify_order.lock();

        let (token, generation, handoff, snapshot) = {
            let mut state = self.state.lock();
            let handoff = state.take_pending_write();
            let token = state.hydration.renew();
            state.generation += 1;
            state.binding = Some(Binding { key: key.clone(), store: Arc::clone(&store) });
            state.phase = StorePhase::Hydrating;
            state.unsaved = false;
            state.annotations = Arc::new(initial);
            (token, state.generation, handoff, Arc::clone(&state.annotations))
        };
        self.phase_tx.send_replace(StorePhase::Hydrating);

        if let Some(handoff) = handoff {
            tracing::debug!(
                document = %handoff.key,
                "writing pending changes before switching documents"
            );
            let shared = Arc::clone(self);
            tokio::spawn(async move { shared.write_snapshot(handoff).await });
        }

        tracing::debug!(
            document = %key,
            generation,
            seeded = snapshot.len(),
            "hydrating annotations"
        );
        self.notify(&snapshot);

        let shared = Arc::clone(self);
        tokio::spawn(async move { shared.hydrate(key, store, token, generation).await });
    }

    async fn hydrate(
        self: Arc<Self>,
        key: String,
        store: Arc<dyn AnnotationStore>,
        token: CancellationToken,
        generation: u64,
    ) {
        let fetched = fetch(store.as_ref(), &token).await;

        let _order = self.notify_order.lock();
        let (snapshot, failure) = {
            let mut state = self.state.lock();
            if token.is_cancelled() || state.generation != generation {
                tracing::debug!(document = %key, generation, "discarding superseded hydration");
                return;
            }

            let failure = match fetched {
                Ok(Some(loaded)) => {
                    tracing::debug!(
                        document = %key,
                        loaded = loaded.len(),
                        "hydrated annotations from store"
                    );
                    state.annotations = Arc::new(loaded);
                    None
                }
                Ok(None) => {
                    tracing::debug!(
                        document = %key,
                        "store has no annotations; keeping initial set"
                    );
                    None
                }
                Err(FetchError::Superseded) => return,
                Err(FetchError::Store { op, source }) => {
                    Some(ControllerError::Persistence { op, document: key.clone(), source })
                }
            };

            state.phase = StorePhase::Hydrated;
            (Arc::clone(&state.annotations), failure)
        };
        self.phase_tx.send_replace(StorePhase::Hydrated);

        self.notify(&snapshot);
        if let Some(failure) = failure {
            self.report(failure);
        }
    }

    fn add_annotation(self: &Arc<Self>, draft: NewAnnotation) -> Annotation {
        let _order = self.notify_order.lock();
        let mut state = self.state.lock();
        let id = self.fresh_id(&state.annotations);
        let annotation = Annotation::from_draft(draft, id);
        Arc::make_mut(&mut state.annotations).insert(0, annotation.clone());
        self.commit(state);
        annotation
    }

    fn update_annotation(
        self: &Arc<Self>,
        id: &AnnotationId,
        position: PositionPatch,
        content: ContentPatch,
    ) -> bool {
        let _order = self.notify_order.lock();
        let mut state = self.state.lock();
        let Some(index) = state.index_of(id) else {
            tracing::debug!(%id, "ignoring update for unknown annotation");
            return false;
        };
        let annotation = &mut Arc::make_mut(&mut state.annotations)[index];
        position.apply_to(&mut annotation.position);
        content.apply_to(&mut annotation.content);
        self.commit(state);
        true
    }

    fn update_comment(self: &Arc<Self>, id: &AnnotationId, comment: CommentPatch) -> bool {
        let _order = self.notify_order.lock();
        let mut state = self.state.lock();
        let Some(index) = state.index_of(id) else {
            tracing::debug!(%id, "ignoring comment update for unknown annotation");
            return false;
        };
        comment.apply_to(&mut Arc::make_mut(&mut state.annotations)[index].comment);
        self.commit(state);
        true
    }

    fn remove_annotation(self: &Arc<Self>, id: &AnnotationId) -> Option<Annotation> {
        let _order = self.notify_order.lock();
        let mut state = self.state.lock();
        let Some(index) = state.index_of(id) else {
            tracing::debug!(%id, "ignoring removal of unknown annotation");
            return None;
        };
        let removed = Arc::make_mut(&mut state.annotations).remove(index);
        self.commit(state);
        Some(removed)
    }

    fn replace_all(self: &Arc<Self>, replacement: Vec<Annotation>) {
        let _order = self.notify_order.lock();
        let mut state = self.state.lock();
        state.annotations = Arc::new(replacement);
        self.commit(state);
    }

    /// Finish a mutation: restart the debounced save once hydrated, then
    /// notify observers outside the state lock.
    ///
    /// Callers hold `notify_order`. Changes made while hydrating stay in
    /// memory and are replaced by whatever the store returns.
    fn commit(self: &Arc<Self>, mut state: MutexGuard<'_, State>) {
        if state.phase == StorePhase::Hydrated {
            state.unsaved = true;
            self.schedule_save(&mut state);
        }
        let snapshot = Arc::clone(&state.annotations);
        drop(state);
        self.notify(&snapshot);
    }

    fn schedule_save(self: &Arc<Self>, state: &mut State) {
        let Some(binding) = state.binding.as_ref() else {
            return;
        };
        let delay = binding.store.debounce().unwrap_or(self.config.debounce);
        let weak = Arc::downgrade(self);

        state.saves.schedule(delay, async move {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            // Empty when a switch, flush or clear got to the change first.
            let pending = shared.state.lock().capture_write();
            if let Some(pending) = pending {
                shared.write_snapshot(pending).await;
            }
        });
    }

    /// Empty the collection in place. Returns the document whose stored
    /// annotations should be erased.
    fn reset_collection(self: &Arc<Self>) -> Option<(String, Arc<dyn AnnotationStore>)> {
        let _order = self.notify_order.lock();
        let (target, snapshot, finished_hydration) = {
            let mut state = self.state.lock();
            state.saves.cancel();
            state.unsaved = false;
            let finished_hydration = state.phase == StorePhase::Hydrating;
            if finished_hydration {
                state.hydration.cancel();
                state.phase = StorePhase::Hydrated;
            }
            state.annotations = Arc::new(Vec::new());
            let target = state
                .binding
                .as_ref()
                .map(|binding| (binding.key.clone(), Arc::clone(&binding.store)));
            (target, Arc::clone(&state.annotations), finished_hydration)
        };
        if finished_hydration {
            self.phase_tx.send_replace(StorePhase::Hydrated);
        }

        self.notify(&snapshot);
        target
    }

    async fn write_snapshot(&self, pending: PendingWrite) {
        let _gate = self.write_gate.lock().await;
        self.save(pending).await;
    }

    /// Callers hold the write gate.
    async fn save(&self, pending: PendingWrite) {
        let PendingWrite { key, store, annotations } = pending;
        tracing::debug!(document = %key, count = annotations.len(), "saving annotations");
        if let Err(source) = store.save(&annotations).await {
            self.report(ControllerError::Persistence {
                op: PersistenceOp::Save,
                document: key,
                source,
            });
        }
    }

    fn fresh_id(&self, existing: &[Annotation]) -> AnnotationId {
        let taken = |id: &AnnotationId| existing.iter().any(|annotation| &annotation.id == id);

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.generate();
            if !taken(&id) {
                return id;
            }
        }

        tracing::warn!(
            strategy = ?self.ids,
            "id strategy keeps colliding; falling back to sequenced ids"
        );
        loop {
            let id = sequenced_id();
            if !taken(&id) {
                return id;
            }
        }
    }

    fn notify(&self, snapshot: &[Annotation]) {
        if let Some(on_change) = &self.on_change {
            on_change(snapshot);
        }
    }

    fn report(&self, error: ControllerError) {
        tracing::warn!(%error, "annotation persistence failed");
        if let Some(on_error) = &self.on_error {
            on_error(&error);
        }
    }
}
