//! Keyword heuristic used when the remote analysis is unavailable.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{AnalysisProducer, AnalysisRequest, AnalysisResult};
use crate::cases::Case;
use crate::errors::InferenceError;
use crate::session::Judgment;

const EMOTIONAL_TERMS: &[&str] = &[
    "불쌍", "안타", "가엾", "괘씸", "나쁜", "분노", "용서", "화", "어쩔 수 없", "억울", "인간적",
    "죽여", "처단", "보복",
];

const LEGAL_TERMS: &[&str] = &[
    "법", "규정", "원칙", "위반", "전과", "누범", "상해", "고의", "증거", "판례", "합당", "비례",
];

const PUNITIVE_TAGS: &[&str] = &[
    "과잉 처벌 편향",
    "보복 심리 중심",
    "엄벌 만능주의",
    "비례 원칙 간과",
    "응보적 정의관",
    "정의감 과잉",
    "처벌 지상주의",
];

const INTUITION_TAGS: &[&str] = &["직관 기반 편향", "정서적 이입", "주관적 판단", "감정적 접근"];
const UNGROUNDED_TAGS: &[&str] = &["법리적 근거 부재", "상식 기반 판단", "논리 비약 가능성"];
const SYMPATHY_TAGS: &[&str] = &["상황론적 온정주의", "동정심 기반 관대함", "연민에 의한 판단"];
const GENERIC_TAGS: &[&str] = &[
    "원칙주의적 성향",
    "객관적 판단 시도",
    "기계적 법 적용",
    "상식 기반 판단",
    "확증 편향 방어",
];

const PUNITIVE_EMOTION_REASON: &str = "범죄의 중대성에 비해 감정적인 보복 심리가 매우 강하게 반영되었습니다.";
const PUNITIVE_LEGAL_REASON: &str = "죄형법정주의와 비례의 원칙을 크게 벗어난 판결로 분석됩니다.";
const GENERIC_EMOTION_REASON: &str = "입력하신 문장에서 주관적인 감정 표현이 감지되었습니다.";
const GENERIC_LEGAL_REASON: &str = "법률적 근거보다는 일반적인 상식에 기반한 판단으로 보입니다.";

/// Justifications shorter than this many characters count as unsupported.
pub const SHORT_REASON_CHARS: usize = 15;

/// Lexicon hits in a justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermCounts {
    pub emotional: usize,
    pub legal: usize,
}

impl TermCounts {
    /// Each lexicon term counts once no matter how often it appears.
    pub fn of(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self {
            emotional: EMOTIONAL_TERMS.iter().filter(|t| lower.contains(*t)).count(),
            legal: LEGAL_TERMS.iter().filter(|t| lower.contains(*t)).count(),
        }
    }
}

/// Deterministic-given-seed heuristic scorer.
pub struct FallbackScorer {
    rng: Mutex<StdRng>,
}

impl Default for FallbackScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackScorer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible tag selection.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn score(&self, case: &Case, judgment: &Judgment) -> AnalysisResult {
        let text = judgment.reason.as_str();
        let counts = TermCounts::of(text);
        let short = text.chars().count() < SHORT_REASON_CHARS;
        let extreme = judgment.is_extreme();

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        if extreme && (case.is_minor() || short) {
            debug!(case = %case.id, "Fallback scoring: disproportionate punishment");
            return AnalysisResult {
                emotion_score: 90,
                emotion_reason: PUNITIVE_EMOTION_REASON.to_string(),
                legal_score: 5,
                legal_reason: PUNITIVE_LEGAL_REASON.to_string(),
                biases: pick(&mut *rng, PUNITIVE_TAGS, 2),
            };
        }

        let e = counts.emotional as i64;
        let l = counts.legal as i64;
        let emotion_score = (30 + 20 * e - 5 * l).clamp(5, 95) as u8;
        let legal_score = (70 + 10 * l - 15 * e).clamp(5, 95) as u8;

        let mut pool: Vec<&str> = Vec::new();
        if counts.emotional > 0 {
            pool.extend_from_slice(INTUITION_TAGS);
        }
        if counts.legal == 0 && short {
            pool.extend_from_slice(UNGROUNDED_TAGS);
        }
        if text.contains("불쌍") || text.contains("안타") {
            pool.extend_from_slice(SYMPATHY_TAGS);
        }

        let mut biases = Vec::new();
        if !pool.is_empty() {
            let wanted = 2 + rng.gen_range(0..2);
            biases = pick(&mut *rng, &pool, wanted.min(pool.len()));
        }
        if biases.is_empty()
            && let Some(tag) = GENERIC_TAGS.choose(&mut *rng)
        {
            biases.push(tag.to_string());
        }

        debug!(
            case = %case.id,
            emotional = counts.emotional,
            legal = counts.legal,
            emotion_score,
            legal_score,
            "Fallback scoring: keyword heuristic"
        );

        AnalysisResult {
            emotion_score,
            emotion_reason: GENERIC_EMOTION_REASON.to_string(),
            legal_score,
            legal_reason: GENERIC_LEGAL_REASON.to_string(),
            biases,
        }
    }
}

/// Distinct tags chosen uniformly without replacement.
fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[&str], amount: usize) -> Vec<String> {
    pool.choose_multiple(rng, amount)
        .map(|t| t.to_string())
        .collect()
}

#[async_trait]
impl AnalysisProducer for FallbackScorer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, InferenceError> {
        Ok(self.score(&request.case, &request.judgment))
    }
}
