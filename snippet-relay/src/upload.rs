#![doc = "Webhook uploader: posts one snippet payload per request to the ingestion endpoint."]
//
//! # Webhook client
//!
//! Implements [`SnippetUploader`] over `reqwest`. One call is one POST; there
//! is no retry. A bearer token is attached when configured, otherwise the
//! request is sent without authorization.
//!
//! Response bodies are returned as JSON when they parse, and wrapped as
//! `{"ok": true, "text": ..}` otherwise (including empty bodies).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use snippet_relay_core::contract::{SnippetPayload, SnippetUploader};
use snippet_relay_core::error::UploadError;

use crate::load_config::WebhookSettings;

pub struct WebhookClient {
    http: Client,
    url: String,
    api_key: Option<String>,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            api_key,
        }
    }

    pub fn from_settings(settings: &WebhookSettings) -> Self {
        let client = Self::new(settings.url.clone(), settings.api_key.clone());
        tracing::info!(
            url = %client.url,
            api_key_set = client.api_key.is_some(),
            "Initialized webhook client"
        );
        client
    }
}

#[async_trait]
impl SnippetUploader for WebhookClient {
    async fn upload(&self, payload: &SnippetPayload) -> Result<Value, UploadError> {
        let auth = if self.api_key.is_some() { "Bearer ****" } else { "none" };
        tracing::debug!(
            url = %self.url,
            authorization = auth,
            body = %serde_json::to_string(payload).unwrap_or_default(),
            "POST snippet"
        );

        let mut request = self.http.post(&self.url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(status = %status, body = %text, "Webhook response");

        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                body: text,
            });
        }
        Ok(parse_response(&text))
    }
}

/// JSON body if it parses, otherwise the raw text wrapped in an object.
pub fn parse_response(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "ok": true, "text": text }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_bodies_are_kept() {
        assert_eq!(parse_response(r#"{"id": 7}"#), json!({ "id": 7 }));
    }

    #[test]
    fn text_and_empty_bodies_are_wrapped() {
        assert_eq!(parse_response("accepted"), json!({ "ok": true, "text": "accepted" }));
        assert_eq!(parse_response(""), json!({ "ok": true, "text": "" }));
    }
}
