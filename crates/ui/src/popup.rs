//! Popup content contract
//!
//! Content that can pin its popup open receives a [`LockControl`] when it is
//! built. Requests go through a channel and are applied by the overlay on its
//! next poll, so content never touches the interaction machine directly.

use marginalia_model::{Comment, CommentPatch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

/// Shown in place of an empty note.
pub const EMPTY_NOTE_TEXT: &str = "No note yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockRequest {
    Lock,
    Unlock,
}

/// Handle given to lockable popup content.
#[derive(Debug, Clone)]
pub struct LockControl {
    requests: mpsc::Sender<LockRequest>,
    locked: Arc<AtomicBool>,
}

impl LockControl {
    pub(crate) fn channel() -> (Self, LockReceiver) {
        let (requests, receiver) = mpsc::channel();
        let locked = Arc::new(AtomicBool::new(false));
        let control = Self { requests, locked: Arc::clone(&locked) };
        (control, LockReceiver { receiver, locked })
    }

    pub fn request_lock(&self) {
        self.send(LockRequest::Lock);
    }

    pub fn request_unlock(&self) {
        self.send(LockRequest::Unlock);
    }

    /// Lock state as of the overlay's last poll.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn send(&self, request: LockRequest) {
        if self.requests.send(request).is_err() {
            tracing::debug!(?request, "popup closed; dropping lock request");
        }
    }
}

/// Overlay side of a [`LockControl`].
#[derive(Debug)]
pub(crate) struct LockReceiver {
    receiver: mpsc::Receiver<LockRequest>,
    locked: Arc<AtomicBool>,
}

impl LockReceiver {
    pub(crate) fn drain(&self) -> Vec<LockRequest> {
        self.receiver.try_iter().collect()
    }

    pub(crate) fn publish(&self, locked: bool) {
        self.locked.store(locked, Ordering::Release);
    }
}

/// Popup content, tagged by whether it takes part in locking.
#[derive(Debug)]
pub enum PopupBody<C> {
    Plain(C),
    Lockable(C),
}

impl<C> PopupBody<C> {
    pub fn is_lockable(&self) -> bool {
        matches!(self, PopupBody::Lockable(_))
    }

    pub fn content(&self) -> &C {
        match self {
            PopupBody::Plain(content) | PopupBody::Lockable(content) => content,
        }
    }

    pub fn content_mut(&mut self) -> &mut C {
        match self {
            PopupBody::Plain(content) | PopupBody::Lockable(content) => content,
        }
    }

    pub fn into_content(self) -> C {
        match self {
            PopupBody::Plain(content) | PopupBody::Lockable(content) => content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteMode {
    Viewing,
    Editing,
}

/// View/edit popup for an annotation's note.
///
/// Editing locks the popup so the pointer can leave while typing; saving or
/// cancelling releases it.
#[derive(Debug)]
pub struct NoteEditor {
    comment: Comment,
    draft: String,
    mode: NoteMode,
    lock: LockControl,
}

impl NoteEditor {
    pub fn new(comment: Comment, lock: LockControl) -> Self {
        let draft = comment.text.clone();
        Self { comment, draft, mode: NoteMode::Viewing, lock }
    }

    pub fn mode(&self) -> NoteMode {
        self.mode
    }

    pub fn comment(&self) -> &Comment {
        &self.comment
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Text for the viewing mode.
    pub fn display_text(&self) -> &str {
        if self.comment.text.is_empty() {
            EMPTY_NOTE_TEXT
        } else {
            &self.comment.text
        }
    }

    pub fn begin_edit(&mut self) {
        if self.mode == NoteMode::Editing {
            return;
        }
        self.draft = self.comment.text.clone();
        self.mode = NoteMode::Editing;
        self.lock.request_lock();
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Edit/cancel toggle of the popup header.
    pub fn toggle_edit(&mut self) {
        match self.mode {
            NoteMode::Viewing => self.begin_edit(),
            NoteMode::Editing => self.cancel_edit(),
        }
    }

    /// Finish editing. Returns the change to apply through the controller.
    pub fn save(&mut self) -> Option<CommentPatch> {
        if self.mode != NoteMode::Editing {
            return None;
        }
        self.mode = NoteMode::Viewing;
        self.comment.text = self.draft.clone();
        self.lock.request_unlock();
        Some(CommentPatch::text(self.draft.clone()))
    }

    pub fn cancel_edit(&mut self) {
        if self.mode != NoteMode::Editing {
            return;
        }
        self.mode = NoteMode::Viewing;
        self.draft = self.comment.text.clone();
        self.lock.request_unlock();
    }

    /// Pick up a comment changed elsewhere. An edit in progress keeps its draft.
    pub fn sync(&mut self, comment: Comment) {
        if self.mode == NoteMode::Viewing {
            self.draft = comment.text.clone();
        }
        self.comment = comment;
    }
}
