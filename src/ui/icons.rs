//! Shared status icons with plain-text fallbacks.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "[SKIP]");
pub static PENDING: Emoji<'_, '_> = Emoji("⏳ ", "[..]");
pub static KEY: Emoji<'_, '_> = Emoji("🔑 ", "[>]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static LINK: Emoji<'_, '_> = Emoji("🔗 ", "");
