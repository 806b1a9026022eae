//! Producers of [`AnalysisResult`].
//!
//! Two implementations share the [`AnalysisProducer`] trait:
//! - [`RemoteAnalyzer`] asks the generation service for a JSON analysis
//! - [`FallbackScorer`] derives one locally from keyword heuristics
//!
//! Both honor the same contract (scores in 0..=100, non-empty reasons, at least
//! one bias tag) so renderers never need to know which one ran.

pub mod fallback;
pub mod remote;

pub use fallback::FallbackScorer;
pub use remote::RemoteAnalyzer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cases::Case;
use crate::errors::InferenceError;
use crate::session::Judgment;

/// Score used when the remote body omits one or sends a non-number.
pub const DEFAULT_SCORE: u8 = 50;
/// Reason used when the remote body omits one.
pub const DEFAULT_REASON: &str = "상세 분석을 수행할 수 없습니다.";
/// Sole bias tag when the remote body has no usable list.
pub const UNANALYZABLE_TAG: &str = "분석 불가";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub emotion_score: u8,
    pub emotion_reason: String,
    pub legal_score: u8,
    pub legal_reason: String,
    pub biases: Vec<String>,
}

impl AnalysisResult {
    /// Build a result from loosely-typed JSON, substituting defaults field by field.
    pub fn coerce(value: &Value) -> Self {
        Self {
            emotion_score: coerce_score(value.get("emotionScore")),
            emotion_reason: coerce_reason(value.get("emotionReason")),
            legal_score: coerce_score(value.get("legalScore")),
            legal_reason: coerce_reason(value.get("legalReason")),
            biases: coerce_biases(value.get("biases")),
        }
    }
}

fn coerce_score(value: Option<&Value>) -> u8 {
    value
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .map(|n| n.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(DEFAULT_SCORE)
}

fn coerce_reason(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_REASON)
        .to_string()
}

fn coerce_biases(value: Option<&Value>) -> Vec<String> {
    let tags: Vec<String> = value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    if tags.is_empty() {
        vec![UNANALYZABLE_TAG.to_string()]
    } else {
        tags
    }
}

/// Everything a producer needs to analyze one judgment.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub case: Case,
    pub judgment: Judgment,
    /// Aggregated statistics for the case, empty below the learning threshold.
    pub learning_context: String,
}

impl AnalysisRequest {
    pub fn new(case: Case, judgment: Judgment) -> Self {
        Self {
            case,
            judgment,
            learning_context: String::new(),
        }
    }

    pub fn with_learning_context(mut self, context: impl Into<String>) -> Self {
        self.learning_context = context.into();
        self
    }
}

#[async_trait]
pub trait AnalysisProducer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, InferenceError>;
}
