pub mod config;
pub mod frontmatter;
pub mod lifecycle;
pub mod note;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod store;

pub use config::SyncConfig;
pub use frontmatter::{Frontmatter, FrontmatterError, ParsedDocument};
pub use lifecycle::{
    LifecycleError, Readiness, ReadinessCheck, ServiceConfig, ServiceHost, StartupPolicy,
    ensure_ready,
};
pub use note::{NoteContent, NoteId, Placement, RenderedNote, SyncOutcome};
pub use parser::{ParseError, ParsedNote, parse, parse_document};
pub use pipeline::{InputError, Pipeline, PipelineError, Preview, RunOptions, Stage, SyncReport};
pub use render::{RenderOptions, Renderer, render};
pub use store::{NoteStore, SyncError, sync_note};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
