//! One-shot verdict analysis: `tribunal analyze`.

use anyhow::{Context, Result, bail};
use tracing::info;

use super::{analysis_orchestrator, load_catalog};
use tribunal::config::TribunalConfig;
use tribunal::queue::RequestQueue;
use tribunal::session::{Judgment, Verdict};
use tribunal::ui::report::{print_analysis, with_analysis_progress};

pub struct AnalyzeArgs {
    pub case_id: String,
    pub verdict: String,
    pub sentence: Option<String>,
    pub mitigation: bool,
    pub reason: String,
    pub json: bool,
}

pub async fn cmd_analyze(config: &TribunalConfig, args: AnalyzeArgs) -> Result<()> {
    let catalog = load_catalog(config)?;
    let Some(case) = catalog.find(&args.case_id) else {
        bail!("Unknown case '{}'. Run 'tribunal cases' to list them.", args.case_id);
    };

    let verdict: Verdict = args.verdict.parse()?;
    let judgment = Judgment::new(verdict, args.sentence, args.mitigation, args.reason)?;
    info!(case = %case.id, verdict = %judgment.display_verdict(), "Analyzing verdict");

    let orchestrator = analysis_orchestrator(config, RequestQueue::new(config.cooldown()));

    if args.json {
        let outcome = orchestrator.analyze(case, &judgment).await;
        let json = serde_json::to_string_pretty(&outcome.result)
            .context("Failed to serialize analysis")?;
        println!("{json}");
    } else {
        let outcome = with_analysis_progress(orchestrator.analyze(case, &judgment)).await;
        print_analysis(case, &judgment, &outcome);
    }
    Ok(())
}
