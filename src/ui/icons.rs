//! Shared UI icons.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static HOURGLASS: Emoji<'_, '_> = Emoji("⏳ ", "[..]");
pub static BULB: Emoji<'_, '_> = Emoji("💡 ", "[!]");

// Courtroom
pub static GAVEL: Emoji<'_, '_> = Emoji("⚖️  ", "[*]");
pub static SCROLL: Emoji<'_, '_> = Emoji("📜 ", "");
pub static SPEECH: Emoji<'_, '_> = Emoji("💬 ", ">");

// Analysis
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "[STAT]");
pub static HEART: Emoji<'_, '_> = Emoji("💓 ", "");
pub static BOOK: Emoji<'_, '_> = Emoji("📘 ", "");
pub static TAG: Emoji<'_, '_> = Emoji("🏷️  ", "#");
