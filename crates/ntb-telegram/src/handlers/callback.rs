use std::sync::Arc;

use teloxide::types::CallbackQuery;

use ntb_core::{
    actions::CallbackAction,
    domain::{ChatId, MessageId, MessageRef, UserRef},
    formatting::{self, truncate_text, TITLE_MAX},
    Result,
};

use crate::handlers::record_download_bg;
use crate::router::AppState;

pub(super) async fn handle_callback(
    q: &CallbackQuery,
    user: &UserRef,
    state: &Arc<AppState>,
) -> Result<()> {
    let data = q.data.clone().unwrap_or_default();

    // Without the originating message there is nothing to edit; just ack.
    let Some(message) = q.message.as_ref() else {
        return state.messenger.answer_callback(&q.id, None).await;
    };
    let msg_ref = MessageRef {
        chat_id: ChatId(message.chat.id.0),
        message_id: MessageId(message.id.0),
    };

    match CallbackAction::parse(&data) {
        CallbackAction::GoToPage(page) => go_to_page(q, user, state, msg_ref, page).await,
        CallbackAction::GetMagnet(index) => get_magnet(q, user, state, msg_ref, index).await,
        CallbackAction::NewSearch => {
            state.sessions.clear(user.id).await;
            state.messenger.answer_callback(&q.id, None).await?;
            state
                .messenger
                .edit_html(msg_ref, &formatting::render_search_prompt())
                .await
        }
        CallbackAction::ShowStats => show_stats(q, user, state, msg_ref.chat_id).await,
        CallbackAction::Unknown => {
            state
                .logger
                .debug(&format!("ignoring unknown callback payload: {data}"), Some(user))
                .await;
            state.messenger.answer_callback(&q.id, None).await
        }
    }
}

async fn go_to_page(
    q: &CallbackQuery,
    user: &UserRef,
    state: &Arc<AppState>,
    msg_ref: MessageRef,
    page: usize,
) -> Result<()> {
    match state.sessions.go_to_page(user.id, page).await {
        Some(view) => {
            state.messenger.answer_callback(&q.id, None).await?;
            let (text, keyboard) = formatting::render_results_page(&view);
            state.messenger.edit_keyboard(msg_ref, &text, keyboard).await
        }
        // Stale button (old search, restart): ignore, don't crash.
        None => {
            state
                .messenger
                .answer_callback(&q.id, Some(&formatting::render_session_expired()))
                .await
        }
    }
}

async fn get_magnet(
    q: &CallbackQuery,
    user: &UserRef,
    state: &Arc<AppState>,
    msg_ref: MessageRef,
    index: usize,
) -> Result<()> {
    let Some(selection) = state.sessions.select(user.id, index).await else {
        return state
            .messenger
            .answer_callback(&q.id, Some(&formatting::render_session_expired()))
            .await;
    };

    state.messenger.answer_callback(&q.id, None).await?;
    state
        .logger
        .user_action(
            "MAGNET_REQUESTED",
            user,
            &format!("title='{}'", truncate_text(&selection.result.title, TITLE_MAX)),
        )
        .await;
    state
        .messenger
        .edit_html(
            msg_ref,
            &formatting::render_magnet_progress(&selection.result.title),
        )
        .await?;

    let magnet = match state.nyaa.fetch_magnet(&selection.result.detail_url).await {
        Ok(magnet) => magnet,
        Err(e) => {
            state
                .logger
                .error(
                    &format!(
                        "magnet fetch failed for {}: {e}",
                        selection.result.detail_url
                    ),
                    Some(user),
                )
                .await;
            None
        }
    };

    // A newer search may have replaced the session while we were fetching;
    // its view must not be overwritten by this stale result.
    if state.sessions.generation(user.id).await != Some(selection.generation) {
        state
            .logger
            .debug("dropping stale magnet result", Some(user))
            .await;
        return Ok(());
    }

    match magnet {
        Some(magnet) => {
            record_download_bg(state, user, &selection.result, &magnet);
            state
                .logger
                .user_action(
                    "DOWNLOAD_COMPLETED",
                    user,
                    &format!("title='{}'", truncate_text(&selection.result.title, TITLE_MAX)),
                )
                .await;
            let (text, keyboard) =
                formatting::render_magnet_found(&selection.result, &magnet, selection.current_page);
            state.messenger.edit_keyboard(msg_ref, &text, keyboard).await
        }
        None => {
            let (text, keyboard) = formatting::render_magnet_failed(selection.current_page);
            state.messenger.edit_keyboard(msg_ref, &text, keyboard).await
        }
    }
}

async fn show_stats(
    q: &CallbackQuery,
    user: &UserRef,
    state: &Arc<AppState>,
    chat_id: ChatId,
) -> Result<()> {
    state.messenger.answer_callback(&q.id, None).await?;
    let text = match state.store.user_stats(user.id).await? {
        Some(stats) => formatting::render_user_stats(&stats),
        None => "📭 No stats yet. Try a search first!".to_string(),
    };
    state.messenger.send_html(chat_id, &text).await?;
    Ok(())
}
