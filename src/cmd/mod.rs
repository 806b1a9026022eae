//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled       |
//! |------------|------------------------|
//! | `cases`    | `Cases`, `Stats`       |
//! | `play`     | `Play`                 |
//! | `analyze`  | `Analyze`              |
//! | `config`   | `Config`               |

pub mod analyze;
pub mod cases;
pub mod config;
pub mod play;

pub use analyze::{AnalyzeArgs, cmd_analyze};
pub use cases::{cmd_cases, cmd_stats};
pub use config::cmd_config;
pub use play::cmd_play;

use anyhow::Result;
use std::sync::Arc;
use tribunal::cases::CaseCatalog;
use tribunal::config::TribunalConfig;
use tribunal::inference::GenerationClient;
use tribunal::orchestrator::AnalysisOrchestrator;
use tribunal::queue::RequestQueue;
use tribunal::scorer::RemoteAnalyzer;
use tribunal::store::VerdictStore;

/// The configured override catalog, or the built-in one.
pub(crate) fn load_catalog(config: &TribunalConfig) -> Result<CaseCatalog> {
    match config.cases_path() {
        Some(path) => CaseCatalog::load_or_builtin(&path),
        None => CaseCatalog::builtin(),
    }
}

pub(crate) fn generation_client(config: &TribunalConfig) -> GenerationClient {
    GenerationClient::from_settings(config.inference(), config.api_key())
}

pub(crate) fn analysis_orchestrator(
    config: &TribunalConfig,
    queue: RequestQueue,
) -> AnalysisOrchestrator {
    let remote = RemoteAnalyzer::new(generation_client(config), config.backoff_policy())
        .with_temperature(config.inference().temperature);
    AnalysisOrchestrator::new(queue, Arc::new(remote)).with_store(
        VerdictStore::new(&config.verdicts_path()),
        config.learning_threshold(),
    )
}
