//! Markdown to HTML rendering for the back of a card.

use std::borrow::Cow;
use std::sync::LazyLock;

use pulldown_cmark::{Options, Parser, html};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::note::{NoteContent, RenderedNote};

/// A `<pre><code>` element with no attributes whose first line is a lone
/// language token.
static BARE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<pre><code>([A-Za-z][A-Za-z0-9_+#.-]*)\n").expect("valid bare code regex")
});

static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\[\]|]+)(?:\|([^\[\]]+))?\]\]").expect("valid wikilink regex")
});

/// Rendering switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Rewrite `[[target]]` / `[[target|alias]]` into emphasis before rendering.
    pub wikilinks: bool,
}

/// Turns back-source markdown into display HTML. Rendering never fails.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn render(&self, back_source: &str) -> String {
        let source = if self.options.wikilinks {
            replace_wikilinks(back_source)
        } else {
            Cow::Borrowed(back_source)
        };

        let html = markdown_to_html(&source);
        tag_bare_code_blocks(&html).into_owned()
    }

    pub fn render_note(&self, note: &NoteContent) -> RenderedNote {
        RenderedNote {
            front: note.front.clone(),
            back_html: self.render(&note.back_source),
        }
    }
}

/// Render with default options.
pub fn render(back_source: &str) -> String {
    Renderer::default().render(back_source)
}

fn markdown_to_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Attach a language class to code blocks that carry their language as a
/// bare first line, e.g. `<pre><code>rust\nfn main() {}`.
fn tag_bare_code_blocks(html: &str) -> Cow<'_, str> {
    BARE_CODE_RE.replace_all(html, |caps: &Captures<'_>| {
        format!("<pre><code class=\"language-{}\">", &caps[1])
    })
}

fn replace_wikilinks(source: &str) -> Cow<'_, str> {
    WIKILINK_RE.replace_all(source, |caps: &Captures<'_>| {
        let shown = caps
            .get(2)
            .or_else(|| caps.get(1))
            .map_or("", |m| m.as_str().trim());
        format!("*{shown}*")
    })
}
