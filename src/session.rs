//! Courtroom session state: the selected case, per-role dialogue history, and the
//! user's judgment.

use serde::{Deserialize, Serialize};

use crate::cases::Case;
use crate::errors::JudgmentError;

/// Courtroom party played by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Prosecutor,
    Defendant,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Prosecutor, Role::Defendant];

    /// Korean title used in prompts and transcripts.
    pub fn title(self) -> &'static str {
        match self {
            Role::Prosecutor => "검사",
            Role::Defendant => "피고인",
        }
    }

    /// Prefix shown in front of the model's turns.
    pub fn speaker_prefix(self) -> &'static str {
        match self {
            Role::Prosecutor => "검사 : ",
            Role::Defendant => "피고인 : ",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Prosecutor => write!(f, "prosecutor"),
            Role::Defendant => write!(f, "defendant"),
        }
    }
}

/// Who produced a dialogue turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The judge at the keyboard.
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: Speaker,
    pub role: Role,
    pub text: String,
}

impl DialogueTurn {
    pub fn user(role: Role, text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            role,
            text: text.into(),
        }
    }

    pub fn ai(role: Role, text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Ai,
            role,
            text: text.into(),
        }
    }
}

/// State of one case from selection to verdict.
#[derive(Debug, Clone, Default)]
pub struct Session {
    case: Option<Case>,
    prosecutor: Vec<DialogueTurn>,
    defendant: Vec<DialogueTurn>,
    epoch: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a case. Both histories start over.
    pub fn select_case(&mut self, case: Case) {
        self.case = Some(case);
        self.prosecutor.clear();
        self.defendant.clear();
        self.epoch += 1;
    }

    /// Bumped on every case selection. Work started under an older epoch is stale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn case(&self) -> Option<&Case> {
        self.case.as_ref()
    }

    pub fn history(&self, role: Role) -> &[DialogueTurn] {
        match role {
            Role::Prosecutor => &self.prosecutor,
            Role::Defendant => &self.defendant,
        }
    }

    pub fn push(&mut self, turn: DialogueTurn) {
        match turn.role {
            Role::Prosecutor => self.prosecutor.push(turn),
            Role::Defendant => self.defendant.push(turn),
        }
    }
}

/// The user's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "유죄")]
    Guilty,
    #[serde(rename = "무죄")]
    NotGuilty,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Guilty => "유죄",
            Verdict::NotGuilty => "무죄",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Verdict {
    type Err = JudgmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "유죄" | "guilty" => Ok(Verdict::Guilty),
            "무죄" | "not-guilty" | "not_guilty" | "innocent" => Ok(Verdict::NotGuilty),
            _ => Err(JudgmentError::UnknownVerdict(s.to_string())),
        }
    }
}

/// Sentences offered to the judge, most severe first.
pub const SENTENCE_OPTIONS: &[&str] = &[
    "사형",
    "무기징역",
    "징역 10년 이상",
    "징역 5년",
    "징역 1년",
    "집행유예",
    "벌금형",
];

/// Death penalty or life imprisonment.
pub fn is_extreme_sentence(sentence: &str) -> bool {
    matches!(sentence.trim(), "사형" | "무기징역")
}

/// A validated judgment ready for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    pub verdict: Verdict,
    pub sentence: Option<String>,
    pub mitigation: bool,
    pub reason: String,
}

impl Judgment {
    /// A guilty verdict needs a sentence; a not-guilty verdict never keeps one.
    pub fn new(
        verdict: Verdict,
        sentence: Option<String>,
        mitigation: bool,
        reason: impl Into<String>,
    ) -> Result<Self, JudgmentError> {
        let sentence = sentence.filter(|s| !s.trim().is_empty());
        let sentence = match verdict {
            Verdict::Guilty => Some(sentence.ok_or(JudgmentError::MissingSentence)?),
            Verdict::NotGuilty => None,
        };
        Ok(Self {
            verdict,
            sentence,
            mitigation,
            reason: reason.into(),
        })
    }

    pub fn is_extreme(&self) -> bool {
        self.sentence.as_deref().is_some_and(is_extreme_sentence)
    }

    /// `유죄 (징역 5년) + 감경 고려`, `무죄`.
    pub fn display_verdict(&self) -> String {
        let mut text = self.verdict.to_string();
        if self.verdict == Verdict::Guilty {
            if let Some(sentence) = &self.sentence {
                text.push_str(&format!(" ({sentence})"));
            }
            if self.mitigation {
                text.push_str(" + 감경 고려");
            }
        }
        text
    }
}
