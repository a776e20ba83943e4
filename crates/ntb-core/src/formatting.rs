//! Outbound message rendering (Telegram HTML) and keyboard building.
//!
//! Everything user-visible is assembled here so handlers stay thin and the
//! layouts are unit-testable without a live bot.

use chrono::{DateTime, Utc};

use crate::{
    actions::CallbackAction,
    domain::SearchResult,
    messaging::types::{InlineButton, InlineKeyboard},
    pagination::PageView,
    stats::{BotStats, DownloadRecord, PopularSearch, SearchRecord, UserStats},
};

/// Hard Telegram limit per message.
pub const MESSAGE_LIMIT: usize = 4096;
/// Clamp target leaving headroom for closing tags.
pub const SAFE_MESSAGE_LEN: usize = 4000;
/// Result titles are bounded in list views.
pub const TITLE_MAX: usize = 50;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Bound `s` at `max` characters, ellipsis-suffixed if longer.
pub fn truncate_text(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = s.chars().take(max).collect::<String>();
    out.push_str("...");
    out
}

/// Keep an outbound message under the Telegram limit.
pub fn clamp_message(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = s.chars().take(max.saturating_sub(20)).collect::<String>();
    out.push_str("\n\n... (truncated)");
    out
}

// ============== Search flow ==============

pub fn render_searching(query: &str) -> String {
    format!("🔍 Searching nyaa.si for <code>{}</code>...", escape_html(query))
}

pub fn render_empty_query_error() -> String {
    "❌ Please send a search query first.".to_string()
}

pub fn render_no_results() -> String {
    "❌ No results found or search failed. Please try again.".to_string()
}

pub fn render_search_prompt() -> String {
    "🔍 <b>Ready to search!</b>\n\nJust send me what you want to find on nyaa.si.".to_string()
}

/// One page of results: header, item lines, magnet button per item keyed by
/// global index, nav buttons only where an adjacent page exists.
pub fn render_results_page(view: &PageView) -> (String, InlineKeyboard) {
    let mut text = format!(
        "🔍 <b>Search results for:</b> <code>{}</code>\n📊 Page {} of {} ({}-{} of {})\n",
        escape_html(&view.query),
        view.page + 1,
        view.page_count,
        view.start + 1,
        view.end,
        view.total,
    );

    let mut keyboard = InlineKeyboard::new();

    for (offset, result) in view.items.iter().enumerate() {
        let global = view.start + offset;
        text.push_str(&format!(
            "\n<b>{}.</b> {}\n    📦 <code>{}</code> | 🌱 S: <code>{}</code> | 📥 L: <code>{}</code>\n",
            global + 1,
            escape_html(&truncate_text(&result.title, TITLE_MAX)),
            escape_html(&result.size),
            escape_html(&result.seeders),
            escape_html(&result.leechers),
        ));
        keyboard.push_button(InlineButton::new(
            format!("📥 #{} Magnet link", global + 1),
            CallbackAction::GetMagnet(global).to_string(),
        ));
    }

    let mut nav = Vec::new();
    if view.has_prev {
        nav.push(InlineButton::new(
            "⬅️ Previous",
            CallbackAction::GoToPage(view.page - 1).to_string(),
        ));
    }
    if view.has_next {
        nav.push(InlineButton::new(
            "➡️ Next",
            CallbackAction::GoToPage(view.page + 1).to_string(),
        ));
    }
    keyboard.push_row(nav);
    keyboard.push_button(new_search_button());

    (clamp_message(&text, SAFE_MESSAGE_LEN), keyboard)
}

// ============== Magnet flow ==============

pub fn render_magnet_progress(title: &str) -> String {
    format!(
        "🔄 <b>Getting magnet link for:</b>\n<code>{}</code>\n\nPlease wait...",
        escape_html(title)
    )
}

pub fn render_magnet_found(
    result: &SearchResult,
    magnet: &str,
    current_page: usize,
) -> (String, InlineKeyboard) {
    let text = format!(
        "✅ <b>Magnet link retrieved!</b>\n\n\
<b>Title:</b> <code>{}</code>\n\
<b>Size:</b> <code>{}</code>\n\
<b>Seeders:</b> <code>{}</code> | <b>Leechers:</b> <code>{}</code>\n\n\
📋 <b>Magnet link (tap to copy):</b>\n<code>{}</code>",
        escape_html(&result.title),
        escape_html(&result.size),
        escape_html(&result.seeders),
        escape_html(&result.leechers),
        escape_html(magnet),
    );

    (
        clamp_message(&text, SAFE_MESSAGE_LEN),
        back_keyboard(current_page),
    )
}

pub fn render_magnet_failed(current_page: usize) -> (String, InlineKeyboard) {
    (
        "❌ <b>Failed to get the magnet link.</b>\n\nThe torrent page might be unavailable. Try again in a moment.".to_string(),
        back_keyboard(current_page),
    )
}

fn back_keyboard(current_page: usize) -> InlineKeyboard {
    let mut keyboard = InlineKeyboard::new();
    keyboard.push_button(InlineButton::new(
        "🔙 Back to results",
        CallbackAction::GoToPage(current_page).to_string(),
    ));
    keyboard.push_button(new_search_button());
    keyboard
}

fn new_search_button() -> InlineButton {
    InlineButton::new("🔍 New search", CallbackAction::NewSearch.to_string())
}

// ============== Commands ==============

pub fn render_help() -> (String, InlineKeyboard) {
    let text = "🔍 <b>Nyaa.si Search Bot</b>\n\n\
Type what you're looking for and I'll search nyaa.si for you.\n\n\
<b>📋 Commands:</b>\n\
/help - show this message\n\
/stats - your usage statistics\n\
/history - your recent searches\n\
/downloads - your recent magnet fetches\n\
/popular - popular searches this week\n\
/botstats - global bot statistics"
        .to_string();

    let mut keyboard = InlineKeyboard::new();
    keyboard.push_row(vec![
        InlineButton::new("🔍 Start searching", CallbackAction::NewSearch.to_string()),
        InlineButton::new("📊 My stats", CallbackAction::ShowStats.to_string()),
    ]);
    (text, keyboard)
}

pub fn render_unknown_command() -> String {
    "🤔 Unknown command. Send /help for the list, or just type a search query.".to_string()
}

pub fn render_apology() -> String {
    "❌ <b>Oops, something went wrong.</b>\n\nPlease try again in a moment.".to_string()
}

/// Plain text for callback-query toasts (no HTML there).
pub fn render_session_expired() -> String {
    "That search has expired. Send a new query.".to_string()
}

// ============== Stats views ==============

fn date(d: &DateTime<Utc>) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub fn render_user_stats(stats: &UserStats) -> String {
    let mut lines = vec![
        "📊 <b>Your stats</b>\n".to_string(),
        format!(
            "🔍 Searches: {} total, {} today",
            stats.total_searches, stats.today_searches
        ),
        format!(
            "📥 Downloads: {} total, {} today",
            stats.total_downloads, stats.today_downloads
        ),
    ];
    if let Some(d) = &stats.member_since {
        lines.push(format!("📅 Member since: {}", date(d)));
    }
    if let Some(d) = &stats.last_seen {
        lines.push(format!("🕘 Last seen: {}", date(d)));
    }
    lines.join("\n")
}

pub fn render_bot_stats(stats: &BotStats) -> String {
    [
        "📈 <b>Bot stats</b>\n".to_string(),
        format!("👥 Users: {} total, {} active this week", stats.total_users, stats.active_users_7d),
        format!(
            "🔍 Searches: {} total, {} today",
            stats.total_searches, stats.today_searches
        ),
        format!(
            "📥 Downloads: {} total, {} today",
            stats.total_downloads, stats.today_downloads
        ),
    ]
    .join("\n")
}

pub fn render_history(records: &[SearchRecord]) -> String {
    if records.is_empty() {
        return "📭 No searches yet. Just send me a query!".to_string();
    }
    let mut lines = vec!["🕘 <b>Your recent searches</b>\n".to_string()];
    for (i, r) in records.iter().enumerate() {
        lines.push(format!(
            "{}. <code>{}</code> ({} results)",
            i + 1,
            escape_html(&r.query),
            r.results_count
        ));
    }
    clamp_message(&lines.join("\n"), SAFE_MESSAGE_LEN)
}

pub fn render_downloads(records: &[DownloadRecord]) -> String {
    if records.is_empty() {
        return "📭 No downloads yet.".to_string();
    }
    let mut lines = vec!["📥 <b>Your recent downloads</b>\n".to_string()];
    for (i, r) in records.iter().enumerate() {
        let size = r.size.as_deref().unwrap_or("Unknown");
        lines.push(format!(
            "{}. {} (<code>{}</code>)",
            i + 1,
            escape_html(&truncate_text(&r.title, TITLE_MAX)),
            escape_html(size),
        ));
    }
    clamp_message(&lines.join("\n"), SAFE_MESSAGE_LEN)
}

pub fn render_popular(records: &[PopularSearch]) -> String {
    if records.is_empty() {
        return "📭 No searches recorded this week.".to_string();
    }
    let mut lines = vec!["🔥 <b>Popular searches this week</b>\n".to_string()];
    for (i, r) in records.iter().enumerate() {
        lines.push(format!(
            "{}. <code>{}</code> - {} searches by {} users",
            i + 1,
            escape_html(&r.query),
            r.count,
            r.unique_users,
        ));
    }
    clamp_message(&lines.join("\n"), SAFE_MESSAGE_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::paginate;

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult {
                title: format!("result {i}"),
                detail_url: format!("https://nyaa.si/view/{i}"),
                size: "1 GiB".to_string(),
                seeders: "10".to_string(),
                leechers: "2".to_string(),
            })
            .collect()
    }

    fn flat_payloads(kb: &InlineKeyboard) -> Vec<String> {
        kb.rows
            .iter()
            .flatten()
            .map(|b| b.callback_data.clone())
            .collect()
    }

    #[test]
    fn first_page_offers_next_but_not_previous() {
        let rs = results(12);
        let (text, kb) = render_results_page(&paginate("naruto", &rs, 0, 1).unwrap());

        assert!(text.contains("Page 1 of 3 (1-5 of 12)"));
        let payloads = flat_payloads(&kb);
        assert!(payloads.contains(&"page:1".to_string()));
        assert!(!payloads.iter().any(|p| p == "page:-1"));
        // Magnet buttons carry global indexes 0..4.
        assert!(payloads.contains(&"get_magnet:0".to_string()));
        assert!(payloads.contains(&"get_magnet:4".to_string()));
        assert!(payloads.contains(&"start_search".to_string()));
    }

    #[test]
    fn middle_page_offers_both_directions() {
        let rs = results(12);
        let (text, kb) = render_results_page(&paginate("naruto", &rs, 1, 1).unwrap());

        assert!(text.contains("Page 2 of 3 (6-10 of 12)"));
        let payloads = flat_payloads(&kb);
        assert!(payloads.contains(&"page:0".to_string()));
        assert!(payloads.contains(&"page:2".to_string()));
        assert!(payloads.contains(&"get_magnet:5".to_string()));
    }

    #[test]
    fn last_partial_page_offers_previous_only() {
        let rs = results(12);
        let (text, kb) = render_results_page(&paginate("naruto", &rs, 2, 1).unwrap());

        assert!(text.contains("Page 3 of 3 (11-12 of 12)"));
        let payloads = flat_payloads(&kb);
        assert!(payloads.contains(&"page:1".to_string()));
        assert!(!payloads.contains(&"page:3".to_string()));
        assert!(payloads.contains(&"get_magnet:11".to_string()));
    }

    #[test]
    fn long_titles_are_truncated_with_ellipsis() {
        let mut rs = results(1);
        rs[0].title = "x".repeat(80);
        let (text, _) = render_results_page(&paginate("q", &rs, 0, 1).unwrap());

        assert!(text.contains(&format!("{}...", "x".repeat(TITLE_MAX))));
        assert!(!text.contains(&"x".repeat(TITLE_MAX + 1)));
    }

    #[test]
    fn html_in_scraped_fields_is_escaped() {
        let mut rs = results(1);
        rs[0].title = "<b>bold & dangerous</b>".to_string();
        let (text, _) = render_results_page(&paginate("q<>", &rs, 0, 1).unwrap());

        assert!(text.contains("&lt;b&gt;bold &amp; dangerous&lt;/b&gt;"));
        assert!(text.contains("q&lt;&gt;"));
    }

    #[test]
    fn magnet_view_links_back_to_the_current_page() {
        let rs = results(12);
        let (text, kb) = render_magnet_found(&rs[7], "magnet:?xt=urn:btih:ab&dn=x", 1);

        assert!(text.contains("magnet:?xt=urn:btih:ab&amp;dn=x"));
        let payloads = flat_payloads(&kb);
        assert!(payloads.contains(&"page:1".to_string()));
        assert!(payloads.contains(&"start_search".to_string()));
    }

    #[test]
    fn clamp_keeps_messages_under_the_telegram_limit() {
        let long = "y".repeat(MESSAGE_LIMIT * 2);
        let clamped = clamp_message(&long, SAFE_MESSAGE_LEN);
        assert!(clamped.chars().count() <= SAFE_MESSAGE_LEN);
        assert!(clamped.ends_with("... (truncated)"));

        assert_eq!(clamp_message("short", SAFE_MESSAGE_LEN), "short");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let s = "ナ".repeat(TITLE_MAX + 1);
        let t = truncate_text(&s, TITLE_MAX);
        assert_eq!(t.chars().count(), TITLE_MAX + 3);
    }
}
