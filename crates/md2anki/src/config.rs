use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::ServiceConfig;
use crate::render::RenderOptions;

pub const DEFAULT_DECK: &str = "00_Inbox";
pub const DEFAULT_NOTE_TYPE: &str = "Basic";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8765";
pub const DEFAULT_TAG: &str = "from_mymarkdown";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Everything a sync run needs to know about the store and the service.
///
/// Every field has a default, so a partial TOML file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Deck new notes are filed into.
    pub deck: String,
    pub note_type: String,
    pub front_field: String,
    pub back_field: String,
    /// Tags attached to every created note.
    pub tags: Vec<String>,
    pub endpoint: String,
    pub api_version: u32,
    pub api_key: Option<String>,
    /// Upper bound on a single request to the endpoint, connect included.
    pub request_timeout_secs: u64,
    /// Required input file extension, without the dot.
    pub extension: String,
    pub service: ServiceConfig,
    pub render: RenderOptions,
}

impl SyncConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            deck: DEFAULT_DECK.to_owned(),
            note_type: DEFAULT_NOTE_TYPE.to_owned(),
            front_field: "Front".to_owned(),
            back_field: "Back".to_owned(),
            tags: vec![DEFAULT_TAG.to_owned()],
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            api_version: 6,
            api_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            extension: "md".to_owned(),
            service: ServiceConfig::default(),
            render: RenderOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_anki_basic_note() {
        let config = SyncConfig::default();

        assert_eq!(config.deck, "00_Inbox");
        assert_eq!(config.note_type, "Basic");
        assert_eq!(config.front_field, "Front");
        assert_eq!(config.back_field, "Back");
        assert_eq!(config.endpoint, "http://localhost:8765");
        assert_eq!(config.api_version, 6);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.tags, vec!["from_mymarkdown"]);
        assert!(config.service.auto_launch);
        assert!(!config.render.wikilinks);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let toml_str = r#"
deck = "Networking"

[service]
auto_launch = false

[render]
wikilinks = true
"#;
        let config: SyncConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.deck, "Networking");
        assert_eq!(config.note_type, "Basic");
        assert!(!config.service.auto_launch);
        assert_eq!(config.service.poll_interval_ms, 500);
        assert!(config.render.wikilinks);
    }

    #[test]
    fn custom_fields_and_key() {
        let toml_str = r#"
note_type = "Basic (and reversed card)"
front_field = "Question"
back_field = "Answer"
api_key = "secret"
request_timeout_secs = 3
tags = []
"#;
        let config: SyncConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.front_field, "Question");
        assert_eq!(config.back_field, "Answer");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout_secs, 3);
        assert!(config.tags.is_empty());
    }
}
