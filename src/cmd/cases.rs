//! Case listing and verdict statistics: `tribunal cases`, `tribunal stats`.

use anyhow::{Result, bail};
use console::style;

use super::load_catalog;
use tribunal::config::TribunalConfig;
use tribunal::store::VerdictStore;
use tribunal::ui::icons::SCROLL;
use tribunal::ui::report::stats_lines;

pub fn cmd_cases(config: &TribunalConfig) -> Result<()> {
    let catalog = load_catalog(config)?;
    if catalog.is_empty() {
        println!("No cases available.");
        return Ok(());
    }

    println!();
    for case in catalog.cases() {
        println!("{}{}  {}", SCROLL, style(&case.id).cyan().bold(), case.title);
    }
    println!();
    Ok(())
}

pub fn cmd_stats(config: &TribunalConfig, case_id: &str) -> Result<()> {
    let catalog = load_catalog(config)?;
    let Some(case) = catalog.find(case_id) else {
        bail!("Unknown case '{}'. Run 'tribunal cases' to list them.", case_id);
    };

    let store = VerdictStore::new(&config.verdicts_path());
    match store.stats(case_id) {
        Some(stats) => {
            println!();
            for line in stats_lines(case, &stats) {
                println!("{line}");
            }
            println!();
        }
        None => println!("No verdicts recorded for '{}' yet.", case_id),
    }
    Ok(())
}
