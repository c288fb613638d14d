use std::sync::Arc;

use crate::note::{NoteId, Placement, RenderedNote, SyncOutcome};

/// Errors that can occur when talking to a note store.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("remote error: {0}")]
    Remote(String),
}

/// A remote store of flashcard notes.
///
/// Stores know how to find notes by their front field and how to create
/// or overwrite them. `create` and `update` report rejection through
/// [`SyncOutcome::Failed`] rather than an error.
#[async_trait::async_trait]
pub trait NoteStore: Send + Sync {
    /// Human-readable label identifying this store.
    fn label(&self) -> &str;

    /// Ids of notes whose front field is exactly `front`, in store order.
    async fn find_by_front(&self, front: &str) -> Result<Vec<NoteId>, SyncError>;

    /// Add a new note. The store is asked to refuse duplicates.
    async fn create(&self, note: &RenderedNote, placement: &Placement) -> SyncOutcome;

    /// Overwrite both fields of an existing note, keeping its deck and id.
    async fn update(&self, id: NoteId, note: &RenderedNote) -> SyncOutcome;
}

#[async_trait::async_trait]
impl<T: NoteStore + ?Sized> NoteStore for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn find_by_front(&self, front: &str) -> Result<Vec<NoteId>, SyncError> {
        (**self).find_by_front(front).await
    }

    async fn create(&self, note: &RenderedNote, placement: &Placement) -> SyncOutcome {
        (**self).create(note, placement).await
    }

    async fn update(&self, id: NoteId, note: &RenderedNote) -> SyncOutcome {
        (**self).update(id, note).await
    }
}

/// Write `note` to `store`, keyed on its front text.
///
/// Always looks the front up first: the first match is overwritten,
/// otherwise a new note is created. A failed lookup is returned as an
/// error so that a broken store never leads to a blind create.
pub async fn sync_note(
    store: &dyn NoteStore,
    note: &RenderedNote,
    placement: &Placement,
) -> Result<SyncOutcome, SyncError> {
    let existing = store.find_by_front(&note.front).await?;

    let outcome = match existing.first() {
        Some(&id) => {
            if existing.len() > 1 {
                tracing::warn!(
                    store = store.label(),
                    matches = existing.len(),
                    "several notes share this front, updating the first"
                );
            }
            tracing::debug!(store = store.label(), %id, "updating existing note");
            store.update(id, note).await
        }
        None => {
            tracing::debug!(store = store.label(), deck = %placement.deck, "creating note");
            store.create(note, placement).await
        }
    };

    Ok(outcome)
}
