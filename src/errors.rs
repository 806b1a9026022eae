//! Typed error hierarchy for the tribunal crate.
//!
//! - `InferenceError`: terminal outcomes of a call to the generation service
//! - `JudgmentError`: rejected judgment submissions
//! - `DialogueError`: questions that cannot be put to a party

use thiserror::Error;

/// Terminal failure of a single inference call.
///
/// Rate limiting is only terminal once the backoff schedule has been spent;
/// every other variant ends the call immediately.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Rate limit still in effect after {attempts} retries")]
    RateLimitExhausted { attempts: u32 },

    #[error("Inference service returned status {status}")]
    Server { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response body: {0}")]
    MalformedResponse(String),

    #[error("No API key configured for the inference service")]
    MissingCredential,
}

impl InferenceError {
    /// Whether the failure happened before any request left the process.
    pub fn is_local(&self) -> bool {
        matches!(self, InferenceError::MissingCredential)
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => InferenceError::Server {
                status: status.as_u16(),
            },
            None => InferenceError::Transport(err.to_string()),
        }
    }
}

/// Errors from validating a judgment before analysis.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JudgmentError {
    #[error("유죄를 선택하신 경우 형량을 지정해주세요.")]
    MissingSentence,

    #[error("Unknown verdict '{0}'. Valid values: 유죄, 무죄, guilty, not-guilty")]
    UnknownVerdict(String),
}

/// Reasons a dialogue request is refused before it reaches the queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DialogueError {
    #[error("No case has been selected")]
    NoCaseSelected,

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("The case changed before the question was answered")]
    CaseChanged,
}
