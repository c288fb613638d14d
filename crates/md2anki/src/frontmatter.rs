use std::collections::HashMap;

use serde::Deserialize;

const DELIMITER: &str = "---";

/// Metadata fields parsed from YAML between `---` delimiters.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Frontmatter {
    #[serde(default)]
    pub title: Option<String>,
    /// Deck to file the note into, overriding the configured default.
    #[serde(default)]
    pub deck: Option<String>,
    /// Extra tags, either a YAML list or a comma/space separated string.
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    /// Any additional fields not explicitly modeled.
    #[serde(flatten)]
    pub extras: HashMap<String, serde_yaml_ng::Value>,
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Joined(String),
    }

    let tags = match Option::<Tags>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Tags::List(list)) => list,
        Some(Tags::Joined(joined)) => joined
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::to_owned)
            .collect(),
    };

    Ok(tags
        .into_iter()
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect())
}

/// Result of splitting a markdown document into optional frontmatter and body.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub frontmatter: Option<Frontmatter>,
    pub body: String,
}

/// Parse a markdown document, extracting YAML frontmatter if present.
///
/// Frontmatter must be delimited by `---` on its own line at the very
/// start of the document. A document without an opening or closing
/// delimiter is all body; a `---` further down is a horizontal rule and
/// is left alone. A delimited block that is not valid YAML is an error.
pub fn parse(content: &str) -> Result<ParsedDocument, FrontmatterError> {
    let trimmed = content.trim_start();

    let Some(after_opening) = strip_delimiter_line(trimmed) else {
        return Ok(ParsedDocument {
            frontmatter: None,
            body: content.to_owned(),
        });
    };

    // Find the closing delimiter line.
    let mut offset = 0;
    let mut closing = None;
    for line in after_opening.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            closing = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }

    let Some((yaml_end, body_start)) = closing else {
        // No closing delimiter: treat entire content as body with no frontmatter.
        return Ok(ParsedDocument {
            frontmatter: None,
            body: content.to_owned(),
        });
    };

    let yaml_str = &after_opening[..yaml_end];
    let body = &after_opening[body_start..];

    let frontmatter = if yaml_str.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml_ng::from_str(yaml_str)
            .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?
    };

    Ok(ParsedDocument {
        frontmatter: Some(frontmatter),
        body: body.to_owned(),
    })
}

/// Returns the text after the first line if that line is exactly `---`.
fn strip_delimiter_line(text: &str) -> Option<&str> {
    let (first, rest) = match text.find('\n') {
        Some(pos) => (&text[..pos], &text[pos + 1..]),
        None => (text, ""),
    };
    (first.trim_end() == DELIMITER).then_some(rest)
}

#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("invalid YAML in front matter: {0}")]
    InvalidYaml(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_frontmatter() {
        let content = "\
---
title: demo
deck: Networking
tags: [tcp, transport]
---
# What is TCP?
A transport protocol.
";
        let doc = parse(content).unwrap();
        let fm = doc.frontmatter.expect("should have frontmatter");

        assert_eq!(fm.title.as_deref(), Some("demo"));
        assert_eq!(fm.deck.as_deref(), Some("Networking"));
        assert_eq!(fm.tags, vec!["tcp", "transport"]);
        assert_eq!(doc.body, "# What is TCP?\nA transport protocol.\n");
    }

    #[test]
    fn parses_joined_tag_string() {
        let content = "---\ntags: tcp, networking basics\n---\nBody.\n";
        let doc = parse(content).unwrap();
        let fm = doc.frontmatter.expect("should have frontmatter");

        assert_eq!(fm.tags, vec!["tcp", "networking", "basics"]);
    }

    #[test]
    fn returns_none_frontmatter_when_absent() {
        let content = "# Just a markdown file\n\nNo frontmatter here.\n";
        let doc = parse(content).unwrap();

        assert!(doc.frontmatter.is_none());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn returns_none_frontmatter_when_no_closing_delimiter() {
        let content = "\
---
title: Broken
# This never closes
";
        let doc = parse(content).unwrap();

        assert!(doc.frontmatter.is_none());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn horizontal_rule_in_body_is_not_a_delimiter() {
        let content = "# Question\nFirst part\n---\nSecond part\n";
        let doc = parse(content).unwrap();

        assert!(doc.frontmatter.is_none());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn captures_extra_fields() {
        let content = "\
---
title: Extended
date: \"2023-10-06\"
---
Body.
";
        let doc = parse(content).unwrap();
        let fm = doc.frontmatter.expect("should have frontmatter");

        assert!(fm.extras.contains_key("date"));
        assert!(fm.tags.is_empty());
    }

    #[test]
    fn empty_block_is_default_frontmatter() {
        let content = "---\n---\n# Q\nA\n";
        let doc = parse(content).unwrap();

        assert_eq!(doc.frontmatter, Some(Frontmatter::default()));
        assert_eq!(doc.body, "# Q\nA\n");
    }

    #[test]
    fn handles_crlf_delimiters() {
        let content = "---\r\ntitle: win\r\n---\r\n# Q\r\nA\r\n";
        let doc = parse(content).unwrap();
        let fm = doc.frontmatter.expect("should have frontmatter");

        assert_eq!(fm.title.as_deref(), Some("win"));
        assert_eq!(doc.body, "# Q\r\nA\r\n");
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let content = "---\ntitle: [unclosed\n---\n# Q\nA\n";
        let err = parse(content).unwrap_err();

        assert!(matches!(err, FrontmatterError::InvalidYaml(_)));
    }
}
