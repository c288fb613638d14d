use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::lifecycle::{LifecycleError, ReadinessCheck, ServiceHost};
use crate::note::{NoteId, Placement, RenderedNote, SyncOutcome};
use crate::store::{NoteStore, SyncError};

/// A note as held by [`InMemoryNoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub id: NoteId,
    pub front: String,
    pub back: String,
    pub deck: String,
    pub tags: Vec<String>,
}

#[derive(Default)]
struct State {
    notes: Vec<StoredNote>,
    next_id: i64,
    lookup_error: Option<String>,
    write_error: Option<String>,
}

/// In-memory note store for testing. Behaves like a store that refuses
/// duplicate fronts on create.
#[derive(Default)]
pub struct InMemoryNoteStore {
    state: Mutex<State>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1_000,
                ..State::default()
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: NoteId) -> Option<StoredNote> {
        let state = self.state.lock().unwrap();
        state.notes.iter().find(|n| n.id == id).cloned()
    }

    pub fn notes(&self) -> Vec<StoredNote> {
        self.state.lock().unwrap().notes.clone()
    }

    /// Insert a note directly, bypassing the duplicate check.
    pub fn insert_raw(&self, front: &str, back: &str, deck: &str) -> NoteId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate();
        state.notes.push(StoredNote {
            id,
            front: front.to_owned(),
            back: back.to_owned(),
            deck: deck.to_owned(),
            tags: Vec::new(),
        });
        id
    }

    /// Make every subsequent lookup fail with `detail`.
    pub fn fail_lookups(&self, detail: &str) {
        self.state.lock().unwrap().lookup_error = Some(detail.to_owned());
    }

    /// Make every subsequent create and update fail with `detail`.
    pub fn reject_writes(&self, detail: &str) {
        self.state.lock().unwrap().write_error = Some(detail.to_owned());
    }
}

impl State {
    fn allocate(&mut self) -> NoteId {
        self.next_id += 1;
        NoteId::new(self.next_id)
    }
}

#[async_trait::async_trait]
impl NoteStore for InMemoryNoteStore {
    fn label(&self) -> &str {
        "in-memory"
    }

    async fn find_by_front(&self, front: &str) -> Result<Vec<NoteId>, SyncError> {
        let state = self.state.lock().unwrap();
        if let Some(detail) = &state.lookup_error {
            return Err(SyncError::Lookup(detail.clone()));
        }
        Ok(state
            .notes
            .iter()
            .filter(|n| n.front == front)
            .map(|n| n.id)
            .collect())
    }

    async fn create(&self, note: &RenderedNote, placement: &Placement) -> SyncOutcome {
        let mut state = self.state.lock().unwrap();
        if let Some(detail) = &state.write_error {
            return SyncOutcome::Failed(detail.clone());
        }
        if state.notes.iter().any(|n| n.front == note.front) {
            return SyncOutcome::Failed("cannot create note because it is a duplicate".into());
        }

        let id = state.allocate();
        state.notes.push(StoredNote {
            id,
            front: note.front.clone(),
            back: note.back_html.clone(),
            deck: placement.deck.clone(),
            tags: placement.tags.clone(),
        });
        SyncOutcome::Created(Some(id))
    }

    async fn update(&self, id: NoteId, note: &RenderedNote) -> SyncOutcome {
        let mut state = self.state.lock().unwrap();
        if let Some(detail) = &state.write_error {
            return SyncOutcome::Failed(detail.clone());
        }
        match state.notes.iter_mut().find(|n| n.id == id) {
            Some(stored) => {
                stored.front = note.front.clone();
                stored.back = note.back_html.clone();
                SyncOutcome::Updated(id)
            }
            None => SyncOutcome::Failed(format!("note was not found: {id}")),
        }
    }
}

/// Scripted [`ServiceHost`]: running or not, counting launches.
pub struct FakeHost {
    running: bool,
    launch_error: Option<String>,
    launches: AtomicU32,
}

impl FakeHost {
    pub fn running() -> Self {
        Self {
            running: true,
            launch_error: None,
            launches: AtomicU32::new(0),
        }
    }

    pub fn stopped() -> Self {
        Self {
            running: false,
            ..Self::running()
        }
    }

    pub fn failing_launch(mut self, detail: &str) -> Self {
        self.launch_error = Some(detail.to_owned());
        self
    }

    pub fn launches(&self) -> u32 {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ServiceHost for FakeHost {
    fn process(&self) -> &str {
        "fake-anki"
    }

    async fn is_running(&self) -> Result<bool, LifecycleError> {
        Ok(self.running)
    }

    async fn launch(&self) -> Result<(), LifecycleError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        match &self.launch_error {
            Some(detail) => Err(LifecycleError::Launch {
                process: self.process().to_owned(),
                detail: detail.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Scripted [`ReadinessCheck`] that fails a fixed number of times first.
pub struct FakeReadiness {
    failures: Option<u32>,
    hangs: bool,
    calls: AtomicU32,
}

impl FakeReadiness {
    pub fn ready_after(failures: u32) -> Self {
        Self {
            failures: Some(failures),
            hangs: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn never_ready() -> Self {
        Self {
            failures: None,
            ..Self::ready_after(0)
        }
    }

    /// A service that accepts the request and never answers.
    pub fn hanging() -> Self {
        Self {
            hangs: true,
            ..Self::never_ready()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReadinessCheck for FakeReadiness {
    async fn check_ready(&self) -> Result<(), SyncError> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hangs {
            std::future::pending::<()>().await;
        }
        match self.failures {
            Some(failures) if previous >= failures => Ok(()),
            _ => Err(SyncError::Network("connection refused".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(front: &str) -> RenderedNote {
        RenderedNote {
            front: front.to_owned(),
            back_html: "<p>A</p>".to_owned(),
        }
    }

    #[tokio::test]
    async fn create_refuses_duplicate_front() {
        let store = InMemoryNoteStore::new();
        let placement = Placement::new("Inbox");

        assert!(matches!(
            store.create(&note("Q"), &placement).await,
            SyncOutcome::Created(Some(_))
        ));
        assert!(store.create(&note("Q"), &placement).await.is_failed());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_note_fails() {
        let store = InMemoryNoteStore::new();
        let outcome = store.update(NoteId::new(1), &note("Q")).await;

        assert_eq!(outcome, SyncOutcome::Failed("note was not found: 1".into()));
    }

    #[tokio::test]
    async fn lookup_is_exact_match() {
        let store = InMemoryNoteStore::new();
        store.insert_raw("What is TCP?", "a", "Inbox");
        store.insert_raw("What is TCP", "b", "Inbox");

        let ids = store.find_by_front("What is TCP?").await.unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn readiness_counts_calls() {
        let readiness_check = FakeReadiness::ready_after(1);

        assert!(readiness_check.check_ready().await.is_err());
        assert!(readiness_check.check_ready().await.is_ok());
        assert_eq!(readiness_check.calls(), 2);
    }
}
