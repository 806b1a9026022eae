//! Case catalog.
//!
//! A catalog ships inside the binary; `[storage] cases_file` can point at a JSON
//! file with the same shape to replace it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUILTIN_CASES: &str = include_str!("../assets/cases.json");

/// Sentence the prosecutor demands when a case records none.
pub const DEFAULT_PROSECUTOR_REQUEST: &str = "법에 따른 엄벌";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealCase {
    pub verdict: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prosecutor_request: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiCase {
    pub verdict: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub title: String,
    pub scenario: String,
    pub law: String,
    pub real_case: RealCase,
    pub ai_case: AiCase,
}

impl Case {
    /// The sentence the prosecutor must demand, verbatim.
    pub fn prosecutor_request(&self) -> &str {
        self.real_case
            .prosecutor_request
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_PROSECUTOR_REQUEST)
    }

    /// Petty cases where an extreme sentence is disproportionate on its face.
    pub fn is_minor(&self) -> bool {
        self.title.contains("장발장") || self.title.contains('빵')
    }

    /// Title, scenario and statute as one block for prompts.
    pub fn context_block(&self) -> String {
        format!(
            "사건 제목: {}\n사건 개요: {}\n법 조항: {}",
            self.title, self.scenario, self.law
        )
    }
}

#[derive(Debug, Clone)]
pub struct CaseCatalog {
    cases: Vec<Case>,
}

impl CaseCatalog {
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_CASES).context("Failed to parse built-in case catalog")
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cases: Vec<Case> = serde_json::from_str(content).context("Invalid case catalog JSON")?;
        Ok(Self { cases })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read case catalog {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// The override file when it exists, the built-in catalog otherwise.
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Self::builtin()
        }
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn find(&self, id: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
