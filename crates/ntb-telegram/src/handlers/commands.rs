use std::sync::Arc;

use ntb_core::{
    domain::{ChatId, UserRef},
    formatting, Result,
};

use crate::handlers::record_user_bg;
use crate::router::AppState;

/// Telegram may send `/cmd@botname args`; we want the bare lowercase name.
fn parse_command(text: &str) -> String {
    text.trim()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

pub(super) async fn handle_command(
    chat_id: ChatId,
    user: &UserRef,
    text: &str,
    state: &Arc<AppState>,
) -> Result<()> {
    match parse_command(text).as_str() {
        "start" | "help" => {
            record_user_bg(state, user);
            state
                .logger
                .info(&format!("user {} opened the bot", user.handle()), Some(user))
                .await;

            let (text, keyboard) = formatting::render_help();
            state
                .messenger
                .send_keyboard(chat_id, &text, keyboard)
                .await?;
        }

        "stats" => {
            let text = match state.store.user_stats(user.id).await? {
                Some(stats) => formatting::render_user_stats(&stats),
                None => "📭 No stats yet. Try a search first!".to_string(),
            };
            state.messenger.send_html(chat_id, &text).await?;
        }

        "history" => {
            let records = state
                .store
                .search_history(user.id, state.cfg.history_limit as i64)
                .await?;
            state
                .messenger
                .send_html(chat_id, &formatting::render_history(&records))
                .await?;
        }

        "downloads" => {
            let records = state
                .store
                .user_downloads(user.id, state.cfg.history_limit as i64)
                .await?;
            state
                .messenger
                .send_html(chat_id, &formatting::render_downloads(&records))
                .await?;
        }

        "popular" => {
            let records = state
                .store
                .popular_searches(
                    state.cfg.history_limit as i64,
                    state.cfg.popular_window_days,
                )
                .await?;
            state
                .messenger
                .send_html(chat_id, &formatting::render_popular(&records))
                .await?;
        }

        "botstats" => {
            let stats = state.store.bot_stats().await?;
            state
                .messenger
                .send_html(chat_id, &formatting::render_bot_stats(&stats))
                .await?;
        }

        _ => {
            state
                .messenger
                .send_html(chat_id, &formatting::render_unknown_command())
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_bot_suffix_and_args() {
        assert_eq!(parse_command("/start"), "start");
        assert_eq!(parse_command("/HELP@NyaaSearchBot"), "help");
        assert_eq!(parse_command("/popular this week"), "popular");
        assert_eq!(parse_command("  /stats  "), "stats");
        assert_eq!(parse_command("/"), "");
    }
}
