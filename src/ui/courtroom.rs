//! Terminal rendering of dialogue turns.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use regex::{Captures, Regex};

use crate::backoff::RetryNotice;
use crate::orchestrator::DialogueSink;
use crate::session::{DialogueTurn, Role, Speaker};
use crate::stream::render_display;
use crate::ui::icons::{BULB, CROSS, SPEECH};

static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<strong>(.*?)</strong>").expect("strong pattern is valid"));

/// Prefix for the judge's own lines.
pub const JUDGE_PREFIX: &str = "판사(나) : ";

/// Characters of a streaming turn shown next to its spinner.
pub const PREVIEW_CHARS: usize = 40;

/// Turn display markup into styled terminal text.
pub fn markup_to_terminal(markup: &str) -> String {
    let styled = STRONG.replace_all(markup, |caps: &Captures| {
        style(&caps[1]).bold().yellow().to_string()
    });
    unescape(&styled)
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">")
}

/// Last line of the display markup as plain text, cut to its final `width` chars.
pub fn live_preview(markup: &str, width: usize) -> String {
    let plain = unescape(&STRONG.replace_all(markup, "$1"));
    let line = plain.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    let count = line.chars().count();
    if count <= width {
        line.to_string()
    } else {
        let tail: String = line.chars().skip(count - width).collect();
        format!("…{tail}")
    }
}

/// Styled line for a finished turn.
pub fn format_turn(turn: &DialogueTurn) -> String {
    match turn.speaker {
        Speaker::User => format!("{}{}", style(JUDGE_PREFIX).cyan(), turn.text),
        Speaker::Ai => format!(
            "{}{}",
            role_prefix(turn.role),
            markup_to_terminal(&render_display(&turn.text))
        ),
    }
}

fn role_prefix(role: Role) -> String {
    match role {
        Role::Prosecutor => style(role.speaker_prefix()).red().bold().to_string(),
        Role::Defendant => style(role.speaker_prefix()).blue().bold().to_string(),
    }
}

/// [`DialogueSink`] that shows a spinner while a turn streams and prints it once done.
pub struct TerminalSink {
    spinners: Mutex<HashMap<Role, ProgressBar>>,
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalSink {
    pub fn new() -> Self {
        Self {
            spinners: Mutex::new(HashMap::new()),
        }
    }

    fn with_spinner(&self, role: Role, f: impl FnOnce(&ProgressBar)) {
        let mut spinners = self.spinners.lock().unwrap_or_else(|e| e.into_inner());
        let bar = spinners.entry(role).or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {prefix:.bold} {msg}")
                    .expect("progress bar template is a valid static string"),
            );
            bar.set_prefix(role.title());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });
        f(bar);
    }

    fn clear_spinner(&self, role: Role) {
        let mut spinners = self.spinners.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = spinners.remove(&role) {
            bar.finish_and_clear();
        }
    }
}

impl DialogueSink for TerminalSink {
    fn pending(&self, role: Role) {
        self.with_spinner(role, |bar| bar.set_message("..."));
    }

    fn retry_notice(&self, role: Role, notice: &RetryNotice) {
        let message = format!(
            "{}무료 API 한도 초과 방지 대기 중... ({}초 후 자동 재시도 {}/{})",
            BULB,
            notice.wait.as_secs(),
            notice.attempt,
            notice.max_retries
        );
        self.with_spinner(role, |bar| bar.set_message(message));
    }

    fn display(&self, role: Role, markup: &str) {
        let preview = live_preview(markup, PREVIEW_CHARS);
        self.with_spinner(role, |bar| bar.set_message(preview));
    }

    fn finished(&self, role: Role, text: &str) {
        self.clear_spinner(role);
        println!("{}{}", SPEECH, format_turn(&DialogueTurn::ai(role, text)));
        println!();
    }

    fn error(&self, role: Role, message: &str) {
        self.clear_spinner(role);
        println!("{}{}{}", CROSS, role_prefix(role), style(message).red());
        println!();
    }
}
