//! Icons shared by the terminal output.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static STOPPED: Emoji<'_, '_> = Emoji("⏹️  ", "[-]");
