//! Request and response bodies for the generation endpoints.

use serde::{Deserialize, Serialize};

use crate::errors::InferenceError;
use crate::stream::GenerateChunk;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub parts: Vec<TextPart>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![TextPart { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

/// Body shared by the streaming and single-shot endpoints:
/// one system instruction, one user content block, generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub system_instruction: ContentBlock,
    pub contents: Vec<ContentBlock>,
    pub generation_config: GenerationConfig,
}

impl GenerateRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, config: GenerationConfig) -> Self {
        Self {
            system_instruction: ContentBlock::text(system),
            contents: vec![ContentBlock::text(user)],
            generation_config: config,
        }
    }

    pub fn system_text(&self) -> &str {
        self.system_instruction
            .parts
            .first()
            .map(|p| p.text.as_str())
            .unwrap_or_default()
    }
}

/// Text of the first candidate's first part in a single-shot response body.
pub fn first_part_text(body: &str) -> Result<String, InferenceError> {
    let chunk: GenerateChunk = serde_json::from_str(body)
        .map_err(|e| InferenceError::MalformedResponse(format!("response body: {e}")))?;
    chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| InferenceError::MalformedResponse("no candidate text".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_wire_field_names() {
        let request = GenerateRequest::new(
            "system",
            "user",
            GenerationConfig {
                temperature: 0.7,
                max_output_tokens: Some(2048),
                response_mime_type: None,
            },
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "system");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "user");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert!(json["generationConfig"].get("responseMimeType").is_none());
        assert_eq!(request.system_text(), "system");
    }

    #[test]
    fn test_first_part_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"emotionScore\":10}"}]}}]}"#;
        assert_eq!(first_part_text(body).unwrap(), r#"{"emotionScore":10}"#);
    }

    #[test]
    fn test_first_part_text_rejects_empty_candidates() {
        assert!(matches!(
            first_part_text(r#"{"candidates":[]}"#),
            Err(InferenceError::MalformedResponse(_))
        ));
        assert!(matches!(
            first_part_text("not json"),
            Err(InferenceError::MalformedResponse(_))
        ));
    }
}
