use std::fmt;

/// Opaque identifier assigned to a note by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(i64);

impl NoteId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The prompt/answer pair extracted from a document body.
///
/// `front` is plain text with heading markers and surrounding whitespace
/// removed. `back_source` is the untouched markdown that follows the
/// heading line, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteContent {
    pub front: String,
    pub back_source: String,
}

/// A note ready to be written to the store: the back has been rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNote {
    pub front: String,
    pub back_html: String,
}

/// Where a newly created note is filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub deck: String,
    pub tags: Vec<String>,
}

impl Placement {
    pub fn new(deck: impl Into<String>) -> Self {
        Self {
            deck: deck.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for tag in tags {
            let tag = tag.into();
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self
    }
}

/// Result of a single write against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new note was added. The id is `None` when the store does not echo it.
    Created(Option<NoteId>),
    /// An existing note had its fields overwritten.
    Updated(NoteId),
    /// The store rejected the write, or the request never completed.
    Failed(String),
}

impl SyncOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn note_id(&self) -> Option<NoteId> {
        match self {
            Self::Created(id) => *id,
            Self::Updated(id) => Some(*id),
            Self::Failed(_) => None,
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(Some(id)) => write!(f, "created note {id}"),
            Self::Created(None) => write!(f, "created note"),
            Self::Updated(id) => write!(f, "updated note {id}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_deduplicates_tags() {
        let placement = Placement::new("Inbox")
            .with_tags(["a", "b"])
            .with_tags(["b", "", "c"]);

        assert_eq!(placement.deck, "Inbox");
        assert_eq!(placement.tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn outcome_display() {
        assert_eq!(
            SyncOutcome::Created(Some(NoteId::new(7))).to_string(),
            "created note 7"
        );
        assert_eq!(SyncOutcome::Created(None).to_string(), "created note");
        assert_eq!(
            SyncOutcome::Updated(NoteId::new(3)).to_string(),
            "updated note 3"
        );
        assert_eq!(
            SyncOutcome::Failed("boom".into()).to_string(),
            "failed: boom"
        );
    }

    #[test]
    fn outcome_note_id() {
        assert_eq!(SyncOutcome::Updated(NoteId::new(3)).note_id(), Some(NoteId::new(3)));
        assert_eq!(SyncOutcome::Created(None).note_id(), None);
        assert!(SyncOutcome::Failed("x".into()).is_failed());
    }
}
