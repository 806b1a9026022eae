//! Interactive hearing: `tribunal play`.

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use super::{analysis_orchestrator, generation_client, load_catalog};
use tribunal::cases::Case;
use tribunal::config::TribunalConfig;
use tribunal::orchestrator::{DialogueOrchestrator, DialogueSettings, TurnHandle};
use tribunal::queue::RequestQueue;
use tribunal::session::{DialogueTurn, Judgment, Role, SENTENCE_OPTIONS, Session, Verdict};
use tribunal::ui::TerminalSink;
use tribunal::ui::courtroom::format_turn;
use tribunal::ui::icons::{GAVEL, SCROLL};
use tribunal::ui::report::{print_analysis, with_analysis_progress};

pub async fn cmd_play(config: &TribunalConfig, case_id: Option<&str>) -> Result<()> {
    let catalog = load_catalog(config)?;
    if catalog.is_empty() {
        bail!("No cases available");
    }

    let case = match case_id {
        Some(id) => catalog
            .find(id)
            .cloned()
            .with_context(|| format!("Unknown case '{}'", id))?,
        None => {
            let titles: Vec<&str> = catalog.cases().iter().map(|c| c.title.as_str()).collect();
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("사건을 선택하세요")
                .items(&titles)
                .default(0)
                .interact()?;
            catalog.cases()[selection].clone()
        }
    };

    print_scenario(&case);

    let queue = RequestQueue::new(config.cooldown());
    let session = Arc::new(Mutex::new(Session::new()));
    session.lock().await.select_case(case.clone());

    let dialogue = DialogueOrchestrator::new(
        generation_client(config),
        queue.clone(),
        config.backoff_policy(),
        Arc::clone(&session),
        Arc::new(TerminalSink::new()),
    )
    .with_settings(DialogueSettings::from_config(config));

    println!("{}{}", GAVEL, style("재판을 시작합니다.").bold());
    println!();
    for (_, handle) in dialogue.enter_courtroom().await {
        wait_turn(handle).await;
    }

    hearing(&dialogue).await?;

    let judgment = prompt_judgment()?;
    let analysis = analysis_orchestrator(config, queue);
    let outcome = with_analysis_progress(analysis.analyze(&case, &judgment)).await;
    print_analysis(&case, &judgment, &outcome);

    let prefers_ai = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("AI 모델의 판결이 더 합리적이라고 생각하십니까?")
        .default(false)
        .interact()?;
    if let Some(store) = analysis.store()
        && let Err(e) = store.update_last_survey(prefers_ai)
    {
        warn!(error = %e, "Failed to record survey answer");
    }
    println!("판결 결과가 등록되었습니다. 학습 기여에 감사드립니다.");
    Ok(())
}

fn print_scenario(case: &Case) {
    println!();
    println!("{}{}", SCROLL, style(&case.title).bold().underlined());
    println!();
    println!("{}", case.scenario);
    println!();
    println!("{}", style(&case.law).dim());
    println!();
}

async fn wait_turn(handle: TurnHandle) {
    if handle.await.is_err() {
        warn!("Dialogue turn was dropped before completing");
    }
}

/// Question loop until the judge is ready to rule.
async fn hearing(dialogue: &DialogueOrchestrator) -> Result<()> {
    let options = &["검사에게 질문하기", "피고인에게 질문하기", "판결 내리기"];
    loop {
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("무엇을 하시겠습니까?")
            .items(options)
            .default(0)
            .interact()?;
        let role = match selection {
            0 => Role::Prosecutor,
            1 => Role::Defendant,
            _ => return Ok(()),
        };

        let question: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{}에게 질문", role.title()))
            .allow_empty(true)
            .interact_text()?;

        match dialogue.ask(role, &question).await {
            Ok(handle) => {
                println!("{}", format_turn(&DialogueTurn::user(role, question.trim())));
                wait_turn(handle).await;
            }
            Err(e) => println!("{}", style(e).yellow()),
        }
    }
}

fn prompt_judgment() -> Result<Judgment> {
    let theme = ColorfulTheme::default();
    let verdict = match Select::with_theme(&theme)
        .with_prompt("판결")
        .items(&["유죄", "무죄"])
        .default(0)
        .interact()?
    {
        0 => Verdict::Guilty,
        _ => Verdict::NotGuilty,
    };

    let (sentence, mitigation) = if verdict == Verdict::Guilty {
        let index = Select::with_theme(&theme)
            .with_prompt("형량")
            .items(SENTENCE_OPTIONS)
            .default(3)
            .interact()?;
        let mitigation = Confirm::with_theme(&theme)
            .with_prompt("감경 사유를 고려하시겠습니까?")
            .default(false)
            .interact()?;
        (Some(SENTENCE_OPTIONS[index].to_string()), mitigation)
    } else {
        (None, false)
    };

    let reason: String = Input::with_theme(&theme)
        .with_prompt("판결 이유")
        .interact_text()?;

    Ok(Judgment::new(verdict, sentence, mitigation, reason)?)
}
