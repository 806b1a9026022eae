//! Configuration view and validation commands: `tribunal config`.

use anyhow::Result;

use super::super::ConfigCommands;
use tribunal::config::{TribunalConfig, TribunalToml};

pub fn cmd_config(config: &TribunalConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = &config.config_path;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Tribunal Configuration");
            println!("======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No tribunal.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!("Data dir: {}", config.data_dir.display());
            println!();

            let toml = config.toml();
            println!("[inference]");
            println!("  base_url = \"{}\"", toml.inference.base_url);
            println!("  model = \"{}\"", toml.inference.model);
            println!("  api_key_env = \"{}\"", toml.inference.api_key_env);
            println!("  temperature = {}", toml.inference.temperature);
            println!("  max_output_tokens = {}", toml.inference.max_output_tokens);
            println!();
            println!("[queue]");
            println!("  cooldown_ms = {}", toml.queue.cooldown_ms);
            println!();
            println!("[retry]");
            println!("  backoff_ms = {:?}", toml.retry.backoff_ms);
            println!();
            println!("[analysis]");
            println!("  learning_threshold = {}", toml.analysis.learning_threshold);
            println!();
            if let Some(cases) = &toml.storage.cases_file {
                println!("[storage]");
                println!("  cases_file = \"{}\"", cases.display());
                println!();
            }

            println!("Effective values (with env overrides):");
            let key_state = if config.api_key().is_some() { "set" } else { "missing" };
            println!("  api key = {}", key_state);
            println!("  verdicts = {}", config.verdicts_path().display());
            println!("  logs = {}", config.log_dir().display());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No tribunal.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = config.toml().validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("tribunal.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            TribunalToml::default().save(config_path)?;

            println!("Created tribunal.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [inference] model, api_key_env, temperature");
            println!("  - [retry] backoff_ms and [queue] cooldown_ms");
            println!("  - [messages] rate-limit texts per call site");
            println!();
        }
    }

    Ok(())
}
