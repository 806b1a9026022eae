//! Analysis produced by the generation service.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{AnalysisProducer, AnalysisRequest, AnalysisResult};
use crate::backoff::{BackoffPolicy, send_with_backoff};
use crate::errors::InferenceError;
use crate::inference::types::first_part_text;
use crate::inference::{GenerateRequest, GenerationClient, GenerationConfig};
use crate::prompts::{ANALYSIS_USER_TEXT, build_analysis_instruction};

const JSON_MIME: &str = "application/json";

/// Single-shot JSON analysis with rate-limit backoff.
#[derive(Debug, Clone)]
pub struct RemoteAnalyzer {
    client: GenerationClient,
    policy: BackoffPolicy,
    temperature: f32,
}

impl RemoteAnalyzer {
    pub fn new(client: GenerationClient, policy: BackoffPolicy) -> Self {
        Self {
            client,
            policy,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn build_request(&self, request: &AnalysisRequest) -> GenerateRequest {
        let system = build_analysis_instruction(
            &request.case,
            &request.judgment,
            &request.learning_context,
        );
        GenerateRequest::new(
            system,
            ANALYSIS_USER_TEXT,
            GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: None,
                response_mime_type: Some(JSON_MIME.to_string()),
            },
        )
    }
}

#[async_trait]
impl AnalysisProducer for RemoteAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, InferenceError> {
        if !self.client.has_credential() {
            return Err(InferenceError::MissingCredential);
        }
        let body = self.build_request(request);
        let response = send_with_backoff(
            &self.policy,
            || self.client.generate(&body),
            |notice| {
                info!(
                    attempt = notice.attempt,
                    max_retries = notice.max_retries,
                    "Analysis rate limited, retrying"
                )
            },
        )
        .await?;

        let text = response.text().await?;
        let payload = first_part_text(&text)?;
        let value: serde_json::Value = serde_json::from_str(&payload)
            .map_err(|e| InferenceError::MalformedResponse(format!("analysis JSON: {e}")))?;

        let result = AnalysisResult::coerce(&value);
        debug!(
            case = %request.case.id,
            emotion = result.emotion_score,
            legal = result.legal_score,
            "Remote analysis parsed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::CaseCatalog;
    use crate::session::{Judgment, Verdict};

    fn request() -> AnalysisRequest {
        let case = CaseCatalog::builtin()
            .unwrap()
            .find("bread-thief")
            .unwrap()
            .clone();
        let judgment = Judgment::new(Verdict::Guilty, Some("징역 1년".into()), true, "전과가 있다").unwrap();
        AnalysisRequest::new(case, judgment).with_learning_context("\n[축적된 국민 법감정 데이터 (100건)]\n")
    }

    #[test]
    fn test_request_asks_for_json() {
        let analyzer = RemoteAnalyzer::new(
            GenerationClient::new("http://127.0.0.1:9", "m", Some("k".into())),
            BackoffPolicy::default(),
        )
        .with_temperature(0.3);
        let body = analyzer.build_request(&request());
        assert_eq!(
            body.generation_config.response_mime_type.as_deref(),
            Some("application/json")
        );
        assert_eq!(body.generation_config.temperature, 0.3);
        assert_eq!(body.generation_config.max_output_tokens, None);
        assert!(body.system_text().contains("[축적된 국민 법감정 데이터 (100건)]"));
        assert_eq!(body.contents[0].parts[0].text, ANALYSIS_USER_TEXT);
    }

    #[tokio::test]
    async fn test_missing_key_fails_locally() {
        let analyzer = RemoteAnalyzer::new(
            GenerationClient::new("http://127.0.0.1:9", "m", None),
            BackoffPolicy::default(),
        );
        let err = analyzer.analyze(&request()).await.unwrap_err();
        assert!(err.is_local());
    }
}
