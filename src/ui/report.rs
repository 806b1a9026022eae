//! Analysis progress and result rendering.

use std::future::Future;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cases::Case;
use crate::orchestrator::AnalysisOutcome;
use crate::scorer::AnalysisResult;
use crate::session::Judgment;
use crate::store::VerdictStats;
use crate::ui::icons::{BOOK, CHART, CHECK, GAVEL, HEART, TAG};

/// Stage messages shown while the analysis runs.
pub const ANALYSIS_STAGES: [&str; 4] = [
    "법적 합치성을 검토 중입니다...",
    "판단에 개입된 감정적 요소를 추출 중입니다...",
    "인지적·도덕적 편향성을 분석 중입니다...",
    "실제 판례 및 AI 모델의 판결과 비교 중입니다...",
];

const STAGE_INTERVAL: Duration = Duration::from_millis(1500);
const BAR_WIDTH: usize = 20;

/// Run `work` behind a staged progress bar (20, 40, 60, 80, then 100 on completion).
pub async fn with_analysis_progress<F, T>(work: F) -> T
where
    F: Future<Output = T>,
{
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:30.magenta/blue}] {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░"),
    );
    bar.set_prefix("분석");
    bar.set_position(20);
    bar.set_message(ANALYSIS_STAGES[0]);

    let ticker = {
        let bar = bar.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(STAGE_INTERVAL);
            interval.tick().await;
            for (index, stage) in ANALYSIS_STAGES.iter().enumerate().skip(1) {
                interval.tick().await;
                bar.set_position(20 + index as u64 * 20);
                bar.set_message(*stage);
            }
        })
    };

    let output = work.await;
    ticker.abort();

    bar.set_position(100);
    bar.finish_with_message(format!("{}분석이 완료되었습니다.", CHECK));
    output
}

/// `█████░░░░░ 50%`
pub fn score_bar(score: u8) -> String {
    let filled = (usize::from(score.min(100)) * BAR_WIDTH + 50) / 100;
    format!(
        "{}{} {}%",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        score
    )
}

pub fn format_biases(biases: &[String]) -> String {
    biases
        .iter()
        .map(|b| format!("#{b}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lines describing an analysis result.
pub fn analysis_lines(result: &AnalysisResult) -> Vec<String> {
    vec![
        format!(
            "{}감정 개입률  {}",
            HEART,
            style(score_bar(result.emotion_score)).red()
        ),
        format!(
            "    분석 결과, 판단의 {}%가 감정/직관에 기인한 것으로 보입니다.",
            result.emotion_score
        ),
        format!("    {}", style(&result.emotion_reason).dim()),
        format!(
            "{}법적 합치성  {}",
            BOOK,
            style(score_bar(result.legal_score)).blue()
        ),
        format!(
            "    기존 법리와 양형 기준과의 일치율은 {}% 입니다.",
            result.legal_score
        ),
        format!("    {}", style(&result.legal_reason).dim()),
        format!("{}{}", TAG, style(format_biases(&result.biases)).yellow()),
    ]
}

/// Side-by-side verdicts: the user's, the court's, and the model reference.
pub fn comparison_lines(case: &Case, judgment: &Judgment) -> Vec<String> {
    vec![
        format!("{}", style("판결 비교").bold().underlined()),
        format!("  {:<8} {}", "나의 판결", style(judgment.display_verdict()).bold()),
        format!("  {:<8} \"{}\"", "", judgment.reason),
        format!("  {:<8} {}", "실제 판결", style(&case.real_case.verdict).bold()),
        format!("  {:<8} {}", "", case.real_case.reason),
        format!("  {:<8} {}", "AI 판결", style(&case.ai_case.verdict).bold()),
        format!("  {:<8} {}", "", case.ai_case.reason),
    ]
}

pub fn print_analysis(case: &Case, judgment: &Judgment, outcome: &AnalysisOutcome) {
    println!();
    println!("{}{}", GAVEL, style("판결 분석 결과").bold());
    for line in analysis_lines(&outcome.result) {
        println!("{line}");
    }
    println!();
    for line in comparison_lines(case, judgment) {
        println!("{line}");
    }
    println!();
}

pub fn stats_lines(case: &Case, stats: &VerdictStats) -> Vec<String> {
    let mut lines = vec![
        format!("{}{} ({}건)", CHART, style(&case.title).bold(), stats.total),
        format!(
            "  유죄 비율: {}%, 무죄 비율: {}%",
            stats.guilty_rate, stats.innocent_rate
        ),
        format!(
            "  평균 감정 개입률: {}%, 평균 법적 합치성: {}%",
            stats.avg_emotion, stats.avg_legal
        ),
    ];
    if !stats.sentences.is_empty() {
        lines.push("  형량 분포:".to_string());
        for (sentence, count) in &stats.sentences {
            lines.push(format!("    {sentence}: {count}"));
        }
    }
    lines
}
