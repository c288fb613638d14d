//! Document parsing: front matter, then a front/back pair from the body.
//!
//! The body is scanned line by line. The first line that starts with a
//! level-one heading marker (`# `) outside a fenced code block becomes the
//! front; everything after that line is the back source. Later headings,
//! `#` characters inside the back, and headings inside code fences are all
//! part of the back.

use crate::frontmatter::{self, Frontmatter, FrontmatterError};
use crate::note::NoteContent;

const HEADING_MARKER: &str = "# ";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no heading found")]
    NoHeading,

    #[error("empty front")]
    EmptyFront,

    #[error("empty back")]
    EmptyBack,

    #[error("malformed front matter: {0}")]
    InvalidMetadata(String),
}

impl From<FrontmatterError> for ParseError {
    fn from(err: FrontmatterError) -> Self {
        match err {
            FrontmatterError::InvalidYaml(detail) => Self::InvalidMetadata(detail),
        }
    }
}

/// A parsed document: optional metadata plus the extracted note.
#[derive(Debug, Clone)]
pub struct ParsedNote {
    pub frontmatter: Option<Frontmatter>,
    pub content: NoteContent,
}

/// Parse raw document text into its metadata and note content.
pub fn parse_document(raw_text: &str) -> Result<ParsedNote, ParseError> {
    let doc = frontmatter::parse(raw_text)?;
    let content = extract_note(&doc.body)?;

    Ok(ParsedNote {
        frontmatter: doc.frontmatter,
        content,
    })
}

/// Parse raw document text into note content, discarding metadata.
pub fn parse(raw_text: &str) -> Result<NoteContent, ParseError> {
    parse_document(raw_text).map(|parsed| parsed.content)
}

/// Extract the front/back pair from a document body (no front matter).
pub fn extract_note(body: &str) -> Result<NoteContent, ParseError> {
    let heading = find_heading(body).ok_or(ParseError::NoHeading)?;

    let front = normalize_heading(heading.text);
    if front.is_empty() {
        return Err(ParseError::EmptyFront);
    }

    let back_source = body[heading.end..].trim();
    if back_source.is_empty() {
        return Err(ParseError::EmptyBack);
    }

    Ok(NoteContent {
        front,
        back_source: back_source.to_owned(),
    })
}

struct Heading<'a> {
    /// Heading text after the marker, without the line terminator.
    text: &'a str,
    /// Byte offset just past the heading line (including its newline).
    end: usize,
}

fn find_heading(body: &str) -> Option<Heading<'_>> {
    let mut fence: Option<Fence> = None;
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let content = line.trim_end_matches(['\n', '\r']);

        if let Some(open) = fence {
            if open.is_closed_by(content) {
                fence = None;
            }
            continue;
        }

        if let Some(open) = Fence::opening(content) {
            fence = Some(open);
            continue;
        }

        if let Some(text) = content.strip_prefix(HEADING_MARKER) {
            return Some(Heading {
                text,
                end: line_start + line.len(),
            });
        }
    }

    None
}

/// Strip whitespace and an optional closing `#` sequence from heading text.
fn normalize_heading(text: &str) -> String {
    let trimmed = text.trim();
    let without_closing = trimmed.trim_end_matches('#');

    // A closing sequence only counts when separated by whitespace.
    if without_closing.len() != trimmed.len()
        && (without_closing.is_empty() || without_closing.ends_with([' ', '\t']))
    {
        without_closing.trim().to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn opening(line: &str) -> Option<Self> {
        let indent = line.len() - line.trim_start_matches(' ').len();
        if indent > 3 {
            return None;
        }
        let rest = &line[indent..];
        let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = rest.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        // Backtick fences may not have backticks in their info string.
        if marker == '`' && rest[len..].contains('`') {
            return None;
        }
        Some(Self { marker, len })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let run = trimmed.chars().take_while(|c| *c == self.marker).count();
        run >= self.len && run == trimmed.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_front_and_back() {
        let note = parse("# What is TCP?\nA reliable transport.\n").unwrap();

        assert_eq!(note.front, "What is TCP?");
        assert_eq!(note.back_source, "A reliable transport.");
    }

    #[test]
    fn parses_document_with_frontmatter() {
        let raw = "\
---
title: demo
---
# What is TCP?
A reliable, connection-oriented transport protocol.
";
        let parsed = parse_document(raw).unwrap();

        assert_eq!(
            parsed.frontmatter.and_then(|fm| fm.title).as_deref(),
            Some("demo")
        );
        assert_eq!(parsed.content.front, "What is TCP?");
        assert_eq!(
            parsed.content.back_source,
            "A reliable, connection-oriented transport protocol."
        );
    }

    #[test]
    fn later_headings_stay_in_back() {
        let note = parse("# Q\nintro\n# Second\nmore ## text\n").unwrap();

        assert_eq!(note.front, "Q");
        assert_eq!(note.back_source, "intro\n# Second\nmore ## text");
    }

    #[test]
    fn hash_inside_line_is_not_a_heading() {
        let err = parse("Use C# for this\nand F# too\n").unwrap_err();
        assert_eq!(err, ParseError::NoHeading);
    }

    #[test]
    fn subheading_is_not_a_front() {
        let err = parse("## Only a level two\nbody\n").unwrap_err();
        assert_eq!(err, ParseError::NoHeading);
    }

    #[test]
    fn text_before_heading_is_ignored() {
        let note = parse("preamble\n\n# Q\nA\n").unwrap();

        assert_eq!(note.front, "Q");
        assert_eq!(note.back_source, "A");
    }

    #[test]
    fn headings_in_code_fences_are_skipped() {
        let body = "```sh\n# not a heading\n```\n# Real\nanswer\n";
        let note = parse(body).unwrap();

        assert_eq!(note.front, "Real");
        assert_eq!(note.back_source, "answer");
    }

    #[test]
    fn code_fence_in_back_is_preserved() {
        let body = "# Q\n```python\n# comment\nprint(1)\n```\n";
        let note = parse(body).unwrap();

        assert_eq!(note.back_source, "```python\n# comment\nprint(1)\n```");
    }

    #[test]
    fn strips_closing_hash_sequence() {
        assert_eq!(parse("# Title ##\nA").unwrap().front, "Title");
        assert_eq!(parse("# C#\nA").unwrap().front, "C#");
    }

    #[test]
    fn handles_crlf_line_endings() {
        let note = parse("# Q\r\nA\r\n").unwrap();

        assert_eq!(note.front, "Q");
        assert_eq!(note.back_source, "A");
    }

    #[test]
    fn empty_front_is_an_error() {
        assert_eq!(parse("#   \nbody").unwrap_err(), ParseError::EmptyFront);
    }

    #[test]
    fn empty_back_is_an_error() {
        assert_eq!(parse("# Q\n   \n").unwrap_err(), ParseError::EmptyBack);
        assert_eq!(parse("# Q").unwrap_err(), ParseError::EmptyBack);
    }

    #[test]
    fn missing_heading_is_an_error() {
        let err = parse("---\ntitle: x\n---\njust text\n").unwrap_err();
        assert_eq!(err, ParseError::NoHeading);
        assert_eq!(err.to_string(), "no heading found");
    }

    #[test]
    fn malformed_frontmatter_is_an_error() {
        let err = parse("---\ntitle: [oops\n---\n# Q\nA\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidMetadata(_)));
    }
}
