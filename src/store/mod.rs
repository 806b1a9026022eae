//! Local verdict history.
//!
//! Every analyzed judgment is appended to `verdicts.json` in the data directory.
//! Per-case statistics feed the analysis prompt once a case has enough entries.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::scorer::AnalysisResult;
use crate::session::{Judgment, Verdict};

/// Post-result survey answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    /// 100 when the user found the AI verdict more convincing, 0 otherwise.
    pub q5: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictRecord {
    pub case_id: String,
    pub timestamp: DateTime<Utc>,
    pub verdict: Verdict,
    pub sentence: Option<String>,
    pub reason: String,
    pub emotion_score: u8,
    pub legal_score: u8,
    pub biases: Vec<String>,
    #[serde(default)]
    pub survey: Survey,
}

impl VerdictRecord {
    pub fn new(case_id: impl Into<String>, judgment: &Judgment, analysis: &AnalysisResult) -> Self {
        Self {
            case_id: case_id.into(),
            timestamp: Utc::now(),
            verdict: judgment.verdict,
            sentence: judgment.sentence.clone(),
            reason: judgment.reason.clone(),
            emotion_score: analysis.emotion_score,
            legal_score: analysis.legal_score,
            biases: analysis.biases.clone(),
            survey: Survey::default(),
        }
    }
}

/// Aggregates over one case's verdicts. Percentages are rounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictStats {
    pub total: usize,
    pub guilty_rate: u32,
    pub innocent_rate: u32,
    pub sentences: BTreeMap<String, usize>,
    pub avg_emotion: u32,
    pub avg_legal: u32,
}

impl VerdictStats {
    pub fn compute(records: &[VerdictRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let total = records.len();
        let guilty = records
            .iter()
            .filter(|r| r.verdict == Verdict::Guilty)
            .count();

        let mut sentences = BTreeMap::new();
        for sentence in records.iter().filter_map(|r| r.sentence.as_ref()) {
            *sentences.entry(sentence.clone()).or_insert(0) += 1;
        }

        let emotion_sum: u64 = records.iter().map(|r| u64::from(r.emotion_score)).sum();
        let legal_sum: u64 = records.iter().map(|r| u64::from(r.legal_score)).sum();

        Some(Self {
            total,
            guilty_rate: percent(guilty as f64, total as f64),
            innocent_rate: percent((total - guilty) as f64, total as f64),
            sentences,
            avg_emotion: (emotion_sum as f64 / total as f64).round() as u32,
            avg_legal: (legal_sum as f64 / total as f64).round() as u32,
        })
    }
}

fn percent(part: f64, total: f64) -> u32 {
    (part / total * 100.0).round() as u32
}

/// JSON-file store of [`VerdictRecord`]s.
#[derive(Debug, Clone)]
pub struct VerdictStore {
    path: PathBuf,
}

impl VerdictStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records. A missing or unreadable file reads as empty.
    pub fn load(&self) -> Vec<VerdictRecord> {
        if !self.path.exists() {
            return Vec::new();
        }
        let parsed = fs::read_to_string(&self.path)
            .context("Failed to read verdict store")
            .and_then(|content| {
                serde_json::from_str(&content).context("Failed to parse verdict store")
            });
        match parsed {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable verdict store");
                Vec::new()
            }
        }
    }

    fn save(&self, records: &[VerdictRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create verdict store directory")?;
        }
        let json = serde_json::to_string_pretty(records).context("Failed to serialize verdicts")?;
        fs::write(&self.path, json).context("Failed to write verdict store")?;
        Ok(())
    }

    pub fn append(&self, record: VerdictRecord) -> Result<()> {
        let mut records = self.load();
        records.push(record);
        self.save(&records)?;
        debug!(total = records.len(), "Verdict appended");
        Ok(())
    }

    pub fn by_case(&self, case_id: &str) -> Vec<VerdictRecord> {
        self.load()
            .into_iter()
            .filter(|r| r.case_id == case_id)
            .collect()
    }

    /// Record the survey answer on the most recent verdict.
    ///
    /// Returns `false` when the store is empty.
    pub fn update_last_survey(&self, prefers_ai: bool) -> Result<bool> {
        let mut records = self.load();
        let Some(last) = records.last_mut() else {
            return Ok(false);
        };
        last.survey.q5 = Some(if prefers_ai { 100 } else { 0 });
        self.save(&records)?;
        Ok(true)
    }

    pub fn stats(&self, case_id: &str) -> Option<VerdictStats> {
        VerdictStats::compute(&self.by_case(case_id))
    }

    /// Prompt block summarizing a case's verdicts, or an empty string below `threshold`.
    pub fn learning_context(&self, case_id: &str, threshold: usize) -> String {
        let records = self.by_case(case_id);
        if records.len() < threshold {
            return String::new();
        }
        match VerdictStats::compute(&records) {
            Some(stats) => format_learning_context(&stats),
            None => String::new(),
        }
    }
}

fn format_learning_context(stats: &VerdictStats) -> String {
    format!(
        "\n[축적된 국민 법감정 데이터 ({}건)]\n\
         - 유죄 비율: {}%, 무죄 비율: {}%\n\
         - 평균 감정 개입률: {}%, 평균 법적 합치성: {}%\n\n\
         위 데이터는 이 사건에 대해 다수의 시민(판사)들이 내린 판결 통계입니다.\n\
         이를 참고하여 분석의 정확도를 높이되, 법리적 원칙에 어긋나지 않도록 하세요.\n",
        stats.total, stats.guilty_rate, stats.innocent_rate, stats.avg_emotion, stats.avg_legal
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (VerdictStore, TempDir) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = VerdictStore::new(&dir.path().join("verdicts.json"));
        (store, dir)
    }

    fn record(case_id: &str, verdict: Verdict, sentence: Option<&str>, emotion: u8, legal: u8) -> VerdictRecord {
        let judgment = Judgment::new(verdict, sentence.map(String::from), false, "이유").unwrap();
        let analysis = AnalysisResult {
            emotion_score: emotion,
            emotion_reason: "e".into(),
            legal_score: legal,
            legal_reason: "l".into(),
            biases: vec!["주관적 판단".into()],
        };
        VerdictRecord::new(case_id, &judgment, &analysis)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let (store, _dir) = setup_store();
        assert!(store.load().is_empty());
        assert!(store.stats("bread-thief").is_none());
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let (store, _dir) = setup_store();
        fs::write(store.path(), "[{broken").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_append_and_filter_by_case() {
        let (store, _dir) = setup_store();
        store.append(record("a", Verdict::Guilty, Some("사형"), 90, 5)).unwrap();
        store.append(record("b", Verdict::NotGuilty, None, 20, 80)).unwrap();
        store.append(record("a", Verdict::NotGuilty, None, 30, 70)).unwrap();

        assert_eq!(store.load().len(), 3);
        let a = store.by_case("a");
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|r| r.case_id == "a"));
        assert_eq!(a[0].survey.q5, None);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_value(record("a", Verdict::Guilty, Some("징역 1년"), 10, 90)).unwrap();
        assert_eq!(json["caseId"], "a");
        assert_eq!(json["verdict"], "유죄");
        assert_eq!(json["emotionScore"], 10);
        assert!(json["survey"]["q5"].is_null());
    }

    #[test]
    fn test_update_last_survey() {
        let (store, _dir) = setup_store();
        assert!(!store.update_last_survey(true).unwrap());

        store.append(record("a", Verdict::Guilty, Some("사형"), 90, 5)).unwrap();
        store.append(record("a", Verdict::NotGuilty, None, 30, 70)).unwrap();
        assert!(store.update_last_survey(true).unwrap());

        let records = store.load();
        assert_eq!(records[0].survey.q5, None);
        assert_eq!(records[1].survey.q5, Some(100));

        store.update_last_survey(false).unwrap();
        assert_eq!(store.load()[1].survey.q5, Some(0));
    }

    #[test]
    fn test_stats_rounding_and_histogram() {
        let (store, _dir) = setup_store();
        store.append(record("a", Verdict::Guilty, Some("사형"), 90, 5)).unwrap();
        store.append(record("a", Verdict::Guilty, Some("사형"), 80, 10)).unwrap();
        store.append(record("a", Verdict::NotGuilty, None, 31, 70)).unwrap();

        let stats = store.stats("a").unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.guilty_rate, 67);
        assert_eq!(stats.innocent_rate, 33);
        assert_eq!(stats.sentences.get("사형"), Some(&2));
        assert_eq!(stats.sentences.len(), 1);
        assert_eq!(stats.avg_emotion, 67);
        assert_eq!(stats.avg_legal, 28);
    }

    #[test]
    fn test_learning_context_respects_threshold() {
        let (store, _dir) = setup_store();
        store.append(record("a", Verdict::Guilty, Some("징역 1년"), 40, 60)).unwrap();
        store.append(record("a", Verdict::NotGuilty, None, 20, 80)).unwrap();

        assert_eq!(store.learning_context("a", 3), "");
        let context = store.learning_context("a", 2);
        assert!(context.contains("[축적된 국민 법감정 데이터 (2건)]"));
        assert!(context.contains("- 유죄 비율: 50%, 무죄 비율: 50%"));
        assert!(context.contains("- 평균 감정 개입률: 30%, 평균 법적 합치성: 70%"));
        assert_eq!(store.learning_context("b", 0), "");
    }
}
