//! One document in, one note synced.
//!
//! Stages run strictly in order and none is revisited:
//! `Start -> LifecycleChecked -> Parsed -> Rendered -> Synced -> Done`.
//! Any fatal error aborts the run at the stage it happened in.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SyncConfig;
use crate::lifecycle::{self, LifecycleError, Readiness, ReadinessCheck, ServiceHost, StartupPolicy};
use crate::note::{Placement, RenderedNote, SyncOutcome};
use crate::parser::{self, ParseError, ParsedNote};
use crate::render::Renderer;
use crate::store::{self, NoteStore, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    LifecycleChecked,
    Parsed,
    Rendered,
    Synced,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::LifecycleChecked => "lifecycle-checked",
            Self::Parsed => "parsed",
            Self::Rendered => "rendered",
            Self::Synced => "synced",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{} must end with .{extension}", .path.display())]
    WrongExtension { path: PathBuf, extension: String },

    #[error("failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl PipelineError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Input(_) => Stage::Start,
            Self::Lifecycle(_) => Stage::LifecycleChecked,
            Self::Parse { .. } => Stage::Parsed,
            Self::Sync(_) => Stage::Synced,
        }
    }
}

/// Per-run overrides that take precedence over front matter and config.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub deck: Option<String>,
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub front: String,
    pub deck: String,
    pub readiness: Readiness,
    pub outcome: SyncOutcome,
}

/// A rendered note that was not sent anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub note: RenderedNote,
    pub placement: Placement,
}

/// Wires lifecycle, parsing, rendering and the store into a single run.
pub struct Pipeline {
    config: SyncConfig,
    renderer: Renderer,
    store: Arc<dyn NoteStore>,
    host: Arc<dyn ServiceHost>,
    readiness_check: Arc<dyn ReadinessCheck>,
}

impl Pipeline {
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn NoteStore>,
        host: Arc<dyn ServiceHost>,
        readiness_check: Arc<dyn ReadinessCheck>,
    ) -> Self {
        let renderer = Renderer::new(config.render.clone());
        Self {
            config,
            renderer,
            store,
            host,
            readiness_check,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync the document at `path` into the store.
    pub async fn run(&self, path: &Path, options: &RunOptions) -> Result<SyncReport, PipelineError> {
        let raw_text = self.load(path)?;
        tracing::info!(stage = %Stage::Start, path = %path.display(), "document loaded");

        let readiness = lifecycle::ensure_ready(
            self.host.as_ref(),
            self.readiness_check.as_ref(),
            StartupPolicy::from(&self.config.service),
        )
        .await?;
        tracing::info!(stage = %Stage::LifecycleChecked, ?readiness, "service ready");

        let parsed = self.parse(path, &raw_text)?;
        tracing::info!(stage = %Stage::Parsed, front = %parsed.content.front, "document parsed");

        let placement = self.placement(&parsed, options);
        let note = self.renderer.render_note(&parsed.content);
        tracing::info!(stage = %Stage::Rendered, bytes = note.back_html.len(), "back rendered");

        let outcome = store::sync_note(self.store.as_ref(), &note, &placement).await?;
        tracing::info!(stage = %Stage::Synced, %outcome, store = self.store.label(), "note synced");

        tracing::debug!(stage = %Stage::Done, "run finished");
        Ok(SyncReport {
            front: note.front,
            deck: placement.deck,
            readiness,
            outcome,
        })
    }

    /// Load, parse and render without touching the service or the store.
    pub fn preview(&self, path: &Path, options: &RunOptions) -> Result<Preview, PipelineError> {
        let raw_text = self.load(path)?;
        let parsed = self.parse(path, &raw_text)?;
        let placement = self.placement(&parsed, options);

        Ok(Preview {
            note: self.renderer.render_note(&parsed.content),
            placement,
        })
    }

    fn load(&self, path: &Path) -> Result<String, InputError> {
        check_extension(path, &self.config.extension)?;
        std::fs::read_to_string(path).map_err(|source| InputError::Unreadable {
            path: path.to_owned(),
            source,
        })
    }

    fn parse(&self, path: &Path, raw_text: &str) -> Result<ParsedNote, PipelineError> {
        parser::parse_document(raw_text).map_err(|source| PipelineError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Deck precedence: run option, then front matter, then config.
    fn placement(&self, parsed: &ParsedNote, options: &RunOptions) -> Placement {
        let frontmatter = parsed.frontmatter.as_ref();
        let deck = options
            .deck
            .clone()
            .or_else(|| frontmatter.and_then(|fm| fm.deck.clone()))
            .unwrap_or_else(|| self.config.deck.clone());

        let extra_tags = frontmatter.map(|fm| fm.tags.clone()).unwrap_or_default();

        Placement::new(deck)
            .with_tags(self.config.tags.iter().cloned())
            .with_tags(extra_tags)
    }
}

/// Reject paths whose extension is not exactly `extension`.
pub fn check_extension(path: &Path, extension: &str) -> Result<(), InputError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext == extension => Ok(()),
        _ => Err(InputError::WrongExtension {
            path: path.to_owned(),
            extension: extension.to_owned(),
        }),
    }
}
