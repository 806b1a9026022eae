use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tribunal::config::TribunalConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "tribunal")]
#[command(version, about = "Courtroom simulation with AI-played prosecutor and defendant")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Data directory (defaults to $TRIBUNAL_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Path to tribunal.toml. Overrides <data-dir>/tribunal.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available cases
    Cases,
    /// Hold an interactive hearing and deliver a verdict
    Play {
        /// Case to open directly instead of choosing from a list
        #[arg(short, long)]
        case: Option<String>,
    },
    /// Analyze a verdict without the interactive hearing
    Analyze {
        #[arg(short, long)]
        case: String,
        /// 유죄 / 무죄 (or guilty / not-guilty)
        #[arg(long)]
        verdict: String,
        /// Required for a guilty verdict, e.g. "징역 5년"
        #[arg(long)]
        sentence: Option<String>,
        /// Mitigating circumstances were considered
        #[arg(long)]
        mitigation: bool,
        /// Justification for the verdict
        #[arg(long)]
        reason: String,
        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show aggregated verdicts for a case
    Stats {
        #[arg(short, long)]
        case: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default tribunal.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = TribunalConfig::with_cli_args(cli.data_dir.clone(), cli.config.clone(), cli.verbose)?;
    let _log_guard = match tribunal::logging::init(&config.log_dir(), cli.verbose, cli.log_json) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {e:#}");
            None
        }
    };

    match &cli.command {
        Commands::Cases => cmd::cmd_cases(&config)?,
        Commands::Play { case } => cmd::cmd_play(&config, case.as_deref()).await?,
        Commands::Analyze {
            case,
            verdict,
            sentence,
            mitigation,
            reason,
            json,
        } => {
            let args = cmd::AnalyzeArgs {
                case_id: case.clone(),
                verdict: verdict.clone(),
                sentence: sentence.clone(),
                mitigation: *mitigation,
                reason: reason.clone(),
                json: *json,
            };
            cmd::cmd_analyze(&config, args).await?
        }
        Commands::Stats { case } => cmd::cmd_stats(&config, case)?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
