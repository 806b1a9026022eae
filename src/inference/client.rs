use reqwest::Response;
use tracing::debug;

use super::types::GenerateRequest;
use crate::config::InferenceSection;
use crate::errors::InferenceError;

/// Client for the streaming and single-shot generation endpoints.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GenerationClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn from_settings(settings: &InferenceSection, api_key: Option<String>) -> Self {
        Self::new(&settings.base_url, &settings.model, api_key)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn stream_url(&self) -> String {
        format!("{}/models/{}:streamGenerateContent", self.base_url, self.model)
    }

    pub fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// POST to the SSE endpoint. The body is left unread for the stream decoder.
    pub async fn stream_generate(&self, request: &GenerateRequest) -> Result<Response, InferenceError> {
        let key = self.key()?;
        debug!(model = %self.model, "Sending streaming generation request");
        Ok(self
            .http
            .post(self.stream_url())
            .query(&[("alt", "sse"), ("key", key)])
            .json(request)
            .send()
            .await?)
    }

    /// POST to the single-shot endpoint.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<Response, InferenceError> {
        let key = self.key()?;
        debug!(model = %self.model, "Sending generation request");
        Ok(self
            .http
            .post(self.generate_url())
            .query(&[("key", key)])
            .json(request)
            .send()
            .await?)
    }

    fn key(&self) -> Result<&str, InferenceError> {
        self.api_key.as_deref().ok_or(InferenceError::MissingCredential)
    }
}
