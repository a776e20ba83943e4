use std::sync::Arc;

use ntb_core::{
    domain::{ChatId, UserRef},
    formatting,
    messaging::types::ChatAction,
    Result,
};

use crate::handlers::{record_search_bg, record_user_bg};
use crate::router::AppState;

/// Free-text message = search query.
pub(super) async fn handle_search(
    chat_id: ChatId,
    user: &UserRef,
    text: &str,
    state: &Arc<AppState>,
) -> Result<()> {
    let query = text.trim();
    if query.is_empty() {
        // Validation error: no network request, nothing recorded.
        state
            .messenger
            .send_html(chat_id, &formatting::render_empty_query_error())
            .await?;
        return Ok(());
    }

    record_user_bg(state, user);
    state
        .logger
        .user_action("SEARCH", user, &format!("query='{query}'"))
        .await;

    let placeholder = state
        .messenger
        .send_html(chat_id, &formatting::render_searching(query))
        .await?;
    let _ = state
        .messenger
        .send_chat_action(chat_id, ChatAction::Typing)
        .await;

    let results = match state.nyaa.search(query, 1).await {
        Ok(results) => results,
        Err(e) => {
            // The scrape failing is routine; the user sees "try again",
            // nothing is recorded, and no automatic retry hits the site.
            state
                .logger
                .error(&format!("search failed for '{query}': {e}"), Some(user))
                .await;
            state
                .messenger
                .edit_html(placeholder, &formatting::render_no_results())
                .await?;
            return Ok(());
        }
    };

    // Zero-result searches are still part of the history.
    record_search_bg(state, user, query, results.len() as u64);
    state
        .logger
        .user_action(
            "SEARCH_COMPLETED",
            user,
            &format!("query='{query}', results={}", results.len()),
        )
        .await;

    match state.sessions.start_search(user.id, query, results).await {
        Some(view) => {
            let (text, keyboard) = formatting::render_results_page(&view);
            state
                .messenger
                .edit_keyboard(placeholder, &text, keyboard)
                .await?;
        }
        None => {
            state
                .messenger
                .edit_html(placeholder, &formatting::render_no_results())
                .await?;
        }
    }
    Ok(())
}
