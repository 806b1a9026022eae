//! Post-verdict analysis.
//!
//! The remote producer runs as a queued task. Any failure, including a missing
//! key or an unparseable body, is replaced by the heuristic scorer, so callers
//! always receive a result. The outcome is then appended to the verdict store.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cases::Case;
use crate::queue::RequestQueue;
use crate::scorer::{AnalysisProducer, AnalysisRequest, AnalysisResult, FallbackScorer};
use crate::session::Judgment;
use crate::store::{VerdictRecord, VerdictStore};

/// Which producer generated a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisSource {
    Remote,
    Fallback,
}

impl fmt::Display for AnalysisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisSource::Remote => write!(f, "remote"),
            AnalysisSource::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub source: AnalysisSource,
}

pub struct AnalysisOrchestrator {
    queue: RequestQueue,
    remote: Arc<dyn AnalysisProducer>,
    fallback: FallbackScorer,
    store: Option<VerdictStore>,
    learning_threshold: usize,
}

impl AnalysisOrchestrator {
    pub fn new(queue: RequestQueue, remote: Arc<dyn AnalysisProducer>) -> Self {
        Self {
            queue,
            remote,
            fallback: FallbackScorer::new(),
            store: None,
            learning_threshold: 100,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackScorer) -> Self {
        self.fallback = fallback;
        self
    }

    /// Persist results and feed accumulated statistics into the prompt.
    pub fn with_store(mut self, store: VerdictStore, learning_threshold: usize) -> Self {
        self.store = Some(store);
        self.learning_threshold = learning_threshold;
        self
    }

    pub fn store(&self) -> Option<&VerdictStore> {
        self.store.as_ref()
    }

    pub async fn analyze(&self, case: &Case, judgment: &Judgment) -> AnalysisOutcome {
        let learning_context = self
            .store
            .as_ref()
            .map(|store| store.learning_context(&case.id, self.learning_threshold))
            .unwrap_or_default();
        let request =
            AnalysisRequest::new(case.clone(), judgment.clone()).with_learning_context(learning_context);

        let remote = Arc::clone(&self.remote);
        let queued = request.clone();
        let receiver = self
            .queue
            .submit(move || async move { remote.analyze(&queued).await })
            .await;

        let outcome = match receiver.await {
            Ok(Ok(result)) => AnalysisOutcome {
                result,
                source: AnalysisSource::Remote,
            },
            Ok(Err(err)) if err.is_local() => {
                info!(case = %case.id, error = %err, "Remote analysis unavailable; using heuristic scorer");
                self.fallback_outcome(&request)
            }
            Ok(Err(err)) => {
                warn!(case = %case.id, error = %err, "Remote analysis failed; using heuristic scorer");
                self.fallback_outcome(&request)
            }
            Err(_) => {
                warn!(case = %case.id, "Remote analysis task was dropped; using heuristic scorer");
                self.fallback_outcome(&request)
            }
        };

        info!(
            case = %case.id,
            source = %outcome.source,
            emotion = outcome.result.emotion_score,
            legal = outcome.result.legal_score,
            "Analysis complete"
        );

        if let Some(store) = &self.store
            && let Err(e) = store.append(VerdictRecord::new(&case.id, judgment, &outcome.result))
        {
            warn!(error = %e, "Failed to save verdict");
        }

        outcome
    }

    fn fallback_outcome(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        AnalysisOutcome {
            result: self.fallback.score(&request.case, &request.judgment),
            source: AnalysisSource::Fallback,
        }
    }
}
