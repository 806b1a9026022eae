//! Configuration for tribunal.
//!
//! Settings are read from `tribunal.toml` in the data directory and layered:
//! file → environment → CLI. Every key has a default, so an absent file is a
//! valid configuration.
//!
//! # Configuration File Format
//!
//! ```toml
//! [inference]
//! base_url = "https://generativelanguage.googleapis.com/v1beta"
//! model = "gemini-3-flash-preview"
//! api_key_env = "GEMINI_API_KEY"
//! temperature = 0.7
//! max_output_tokens = 2048
//!
//! [queue]
//! cooldown_ms = 1000
//!
//! [retry]
//! backoff_ms = [5000, 10000, 15000]
//!
//! [analysis]
//! learning_threshold = 100
//!
//! [messages]
//! opening_rate_limited = "..."
//! reply_rate_limited = "..."
//!
//! [storage]
//! cases_file = "cases.json"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backoff::{BackoffPolicy, DEFAULT_BACKOFF_MS};

/// File name of the configuration inside the data directory.
pub const CONFIG_FILE: &str = "tribunal.toml";

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "TRIBUNAL_DATA_DIR";

/// Generation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Inline key. Prefer `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Output cap for streamed dialogue turns
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    2048
}

impl Default for InferenceSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

/// Request queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSection {
    /// Idle time between two queued inference calls
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_cooldown_ms() -> u64 {
    1000
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Rate-limit retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    /// Wait before each retry; its length is the retry budget
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: Vec<u64>,
}

fn default_backoff_ms() -> Vec<u64> {
    DEFAULT_BACKOFF_MS.to_vec()
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Verdict analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    /// Stored verdicts a case needs before their statistics feed the prompt
    #[serde(default = "default_learning_threshold")]
    pub learning_threshold: usize,
}

fn default_learning_threshold() -> usize {
    100
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            learning_threshold: default_learning_threshold(),
        }
    }
}

/// User-facing messages that differ per call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesSection {
    /// Shown when an opening statement is still rate limited after all retries
    #[serde(default = "default_opening_rate_limited")]
    pub opening_rate_limited: String,
    /// Shown when a reply is still rate limited after all retries
    #[serde(default = "default_reply_rate_limited")]
    pub reply_rate_limited: String,
}

fn default_opening_rate_limited() -> String {
    "API 요청 제한을 초과했습니다. 약 1분 뒤에 페이지를 새로고침 해주세요.".to_string()
}

fn default_reply_rate_limited() -> String {
    "API 요청 제한을 초과했습니다. 약 1분 뒤에 다시 채팅을 전송해주세요.".to_string()
}

impl Default for MessagesSection {
    fn default() -> Self {
        Self {
            opening_rate_limited: default_opening_rate_limited(),
            reply_rate_limited: default_reply_rate_limited(),
        }
    }
}

/// Local file locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSection {
    /// Case catalog override, relative to the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cases_file: Option<PathBuf>,
}

/// The complete tribunal.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TribunalToml {
    #[serde(default)]
    pub inference: InferenceSection,
    #[serde(default)]
    pub queue: QueueSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub messages: MessagesSection,
    #[serde(default)]
    pub storage: StorageSection,
}

impl TribunalToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse tribunal.toml")
    }

    /// Load `tribunal.toml` from `data_dir`, or defaults when it does not exist.
    pub fn load_or_default(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize tribunal.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Collect warnings about suspicious but loadable settings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.retry.backoff_ms.is_empty() {
            warnings.push("retry.backoff_ms is empty: rate-limited calls will never be retried".to_string());
        }
        if !(0.0..=2.0).contains(&self.inference.temperature) {
            warnings.push(format!(
                "inference.temperature {} is outside 0.0-2.0",
                self.inference.temperature
            ));
        }
        if self.analysis.learning_threshold == 0 {
            warnings.push("analysis.learning_threshold is 0: statistics are injected from the first verdict".to_string());
        }
        if self.inference.api_key.is_some() {
            warnings.push(format!(
                "inference.api_key is stored in plain text; consider ${} instead",
                self.inference.api_key_env
            ));
        }
        warnings
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct TribunalConfig {
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub verbose: bool,
    toml: TribunalToml,
}

impl TribunalConfig {
    /// Resolve configuration from CLI arguments, the environment, and the config file.
    ///
    /// `config_path` overrides `<data_dir>/tribunal.toml`.
    pub fn with_cli_args(
        data_dir: Option<PathBuf>,
        config_path: Option<PathBuf>,
        verbose: bool,
    ) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        let config_path = config_path.unwrap_or_else(|| data_dir.join(CONFIG_FILE));
        let toml = if config_path.exists() {
            TribunalToml::load(&config_path)?
        } else {
            TribunalToml::default()
        };
        Ok(Self {
            data_dir,
            config_path,
            verbose,
            toml,
        })
    }

    /// Build from an in-memory TOML structure.
    pub fn from_toml(data_dir: PathBuf, toml: TribunalToml) -> Self {
        let config_path = data_dir.join(CONFIG_FILE);
        Self {
            data_dir,
            config_path,
            verbose: false,
            toml,
        }
    }

    pub fn toml(&self) -> &TribunalToml {
        &self.toml
    }

    pub fn inference(&self) -> &InferenceSection {
        &self.toml.inference
    }

    pub fn messages(&self) -> &MessagesSection {
        &self.toml.messages
    }

    /// API key from the file, falling back to the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        self.toml
            .inference
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.toml.inference.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.toml.queue.cooldown_ms)
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::from_millis(&self.toml.retry.backoff_ms)
    }

    pub fn learning_threshold(&self) -> usize {
        self.toml.analysis.learning_threshold
    }

    pub fn verdicts_path(&self) -> PathBuf {
        self.data_dir.join("verdicts.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Case catalog override, if configured.
    pub fn cases_path(&self) -> Option<PathBuf> {
        self.toml.storage.cases_file.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                self.data_dir.join(p)
            }
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir).context("Failed to create data directory")?;
        std::fs::create_dir_all(self.log_dir()).context("Failed to create log directory")?;
        Ok(())
    }
}

/// `$TRIBUNAL_DATA_DIR`, else the platform data directory.
pub fn default_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|d| d.join("tribunal"))
        .context("Could not determine a data directory; pass --data-dir")
}
