use std::collections::HashMap;
use std::time::Duration;

use md2anki::{
    NoteId, NoteStore, Placement, ReadinessCheck, RenderedNote, SyncConfig, SyncError, SyncOutcome,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Connection and note-model settings for an AnkiConnect endpoint.
#[derive(Debug, Clone)]
pub struct AnkiConnectConfig {
    pub endpoint: String,
    pub api_version: u32,
    pub api_key: Option<String>,
    pub note_type: String,
    pub front_field: String,
    pub back_field: String,
    /// Applies to every request, connect included.
    pub request_timeout: Duration,
}

impl From<&SyncConfig> for AnkiConnectConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_version: config.api_version,
            api_key: config.api_key.clone(),
            note_type: config.note_type.clone(),
            front_field: config.front_field.clone(),
            back_field: config.back_field.clone(),
            request_timeout: config.request_timeout(),
        }
    }
}

/// HTTP client for the AnkiConnect add-on.
///
/// Every call is a `POST` of `{action, version, params}` to a single
/// endpoint; the reply carries `result` and `error`, with `error` null on
/// success.
pub struct AnkiConnectClient {
    client: reqwest::Client,
    config: AnkiConnectConfig,
}

impl AnkiConnectClient {
    pub fn new(config: AnkiConnectConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SyncError::Network(format!("HTTP client error: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AnkiConnectConfig {
        &self.config
    }

    /// Invoke an action and return its `result`, which may be null.
    async fn invoke<P, T>(&self, action: &str, params: P) -> Result<Option<T>, SyncError>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let request = Request {
            action,
            version: self.config.api_version,
            key: self.config.api_key.as_deref(),
            params,
        };

        tracing::debug!(action, endpoint = %self.config.endpoint, "anki-connect request");

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{action} request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SyncError::Network(format!(
                "{action} returned HTTP {}",
                response.status()
            )));
        }

        let body: Response<T> = response
            .json()
            .await
            .map_err(|e| SyncError::Protocol(format!("failed to parse {action} response: {e}")))?;

        match body.error {
            Some(error) => Err(SyncError::Remote(error)),
            None => Ok(body.result),
        }
    }

    fn fields<'a>(&'a self, note: &'a RenderedNote) -> HashMap<&'a str, &'a str> {
        HashMap::from([
            (self.config.front_field.as_str(), note.front.as_str()),
            (self.config.back_field.as_str(), note.back_html.as_str()),
        ])
    }

    /// Search query matching notes whose front field equals `front`.
    pub fn front_query(&self, front: &str) -> String {
        format!("\"{}:{}\"", self.config.front_field, escape_search(front))
    }
}

/// Escape characters that carry meaning in an Anki search term.
pub fn escape_search(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '"' | '*' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait::async_trait]
impl NoteStore for AnkiConnectClient {
    fn label(&self) -> &str {
        &self.config.endpoint
    }

    async fn find_by_front(&self, front: &str) -> Result<Vec<NoteId>, SyncError> {
        let query = self.front_query(front);
        let ids: Option<Vec<i64>> = self
            .invoke("findNotes", json!({ "query": query }))
            .await
            .map_err(|e| SyncError::Lookup(e.to_string()))?;

        let ids = ids.ok_or_else(|| SyncError::Lookup("findNotes returned no result".into()))?;
        Ok(ids.into_iter().map(NoteId::new).collect())
    }

    async fn create(&self, note: &RenderedNote, placement: &Placement) -> SyncOutcome {
        let params = json!({
            "note": {
                "deckName": placement.deck,
                "modelName": self.config.note_type,
                "fields": self.fields(note),
                "options": { "allowDuplicate": false },
                "tags": placement.tags,
            }
        });

        match self.invoke::<_, i64>("addNote", params).await {
            Ok(id) => SyncOutcome::Created(id.map(NoteId::new)),
            Err(e) => SyncOutcome::Failed(e.to_string()),
        }
    }

    async fn update(&self, id: NoteId, note: &RenderedNote) -> SyncOutcome {
        let params = json!({
            "note": {
                "id": id.get(),
                "fields": self.fields(note),
            }
        });

        match self
            .invoke::<_, serde_json::Value>("updateNoteFields", params)
            .await
        {
            Ok(_) => SyncOutcome::Updated(id),
            Err(e) => SyncOutcome::Failed(e.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl ReadinessCheck for AnkiConnectClient {
    async fn check_ready(&self) -> Result<(), SyncError> {
        self.invoke::<_, serde_json::Value>("version", json!({}))
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Serialize)]
struct Request<'a, P> {
    action: &'a str,
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
    params: P,
}

#[derive(Debug, Deserialize)]
struct Response<T> {
    result: Option<T>,
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AnkiConnectClient {
        AnkiConnectClient::new(AnkiConnectConfig::from(&SyncConfig::default())).unwrap()
    }

    #[test]
    fn escapes_search_metacharacters() {
        assert_eq!(escape_search("plain text?"), "plain text?");
        assert_eq!(escape_search(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_search("a*b_c\\d"), r"a\*b\_c\\d");
    }

    #[test]
    fn front_query_is_field_scoped() {
        assert_eq!(client().front_query("What is TCP?"), "\"Front:What is TCP?\"");
    }

    #[test]
    fn config_carries_request_timeout() {
        let config = SyncConfig {
            request_timeout_secs: 4,
            ..SyncConfig::default()
        };

        assert_eq!(
            AnkiConnectConfig::from(&config).request_timeout,
            Duration::from_secs(4)
        );
    }

    #[test]
    fn request_omits_missing_key() {
        let request = Request {
            action: "version",
            version: 6,
            key: None,
            params: json!({}),
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value, json!({ "action": "version", "version": 6, "params": {} }));
    }

    #[test]
    fn response_with_null_result_and_error() {
        let body: Response<serde_json::Value> =
            serde_json::from_str(r#"{"result": null, "error": null}"#).unwrap();

        assert!(body.result.is_none());
        assert!(body.error.is_none());
    }
}
