//! Telegram update handlers.
//!
//! Each inbound update funnels through one top-level catch: a failing
//! handler logs full context and replies with a generic apology, and the
//! process keeps running.

use std::sync::Arc;

use teloxide::prelude::*;

use ntb_core::{
    domain::{ChatId, SearchResult, UserId, UserRef},
    formatting,
};

use crate::router::AppState;

mod callback;
mod commands;
mod search;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user = user_ref(from);
    let chat_id = ChatId(msg.chat.id.0);

    let outcome = match msg.text() {
        Some(text) if text.starts_with('/') => {
            commands::handle_command(chat_id, &user, text, &state).await
        }
        Some(text) => search::handle_search(chat_id, &user, text, &state).await,
        None => state
            .messenger
            .send_html(chat_id, "📝 Send me a text query to search nyaa.si.")
            .await
            .map(|_| ()),
    };

    if let Err(e) = outcome {
        report_failure(&state, chat_id, &user, "message", &e).await;
    }
    Ok(())
}

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let user = user_ref(&q.from);
    let chat_id = q.message.as_ref().map(|m| ChatId(m.chat.id.0));

    if let Err(e) = callback::handle_callback(&q, &user, &state).await {
        match chat_id {
            Some(chat_id) => report_failure(&state, chat_id, &user, "callback", &e).await,
            None => {
                state
                    .logger
                    .error(&format!("callback handler failed: {e}"), Some(&user))
                    .await
            }
        }
    }
    Ok(())
}

async fn report_failure(
    state: &AppState,
    chat_id: ChatId,
    user: &UserRef,
    kind: &str,
    err: &ntb_core::Error,
) {
    state
        .logger
        .error(&format!("{kind} handler failed: {err}"), Some(user))
        .await;
    let _ = state
        .messenger
        .send_html(chat_id, &formatting::render_apology())
        .await;
}

fn user_ref(user: &teloxide::types::User) -> UserRef {
    UserRef {
        id: UserId(user.id.0 as i64),
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
    }
}

// ============== Fire-and-forget persistence ==============
//
// Stats writes never block or fail the search flow; their errors end up in
// the log only.

pub(crate) fn record_user_bg(state: &Arc<AppState>, user: &UserRef) {
    let state = state.clone();
    let user = user.clone();
    tokio::spawn(async move {
        if let Err(e) = state.store.record_user(&user).await {
            state
                .logger
                .warning(&format!("record_user failed: {e}"), Some(&user))
                .await;
        }
    });
}

pub(crate) fn record_search_bg(state: &Arc<AppState>, user: &UserRef, query: &str, count: u64) {
    let state = state.clone();
    let user = user.clone();
    let query = query.to_string();
    tokio::spawn(async move {
        if let Err(e) = state.store.record_search(user.id, &query, count).await {
            state
                .logger
                .warning(&format!("record_search failed: {e}"), Some(&user))
                .await;
        }
    });
}

pub(crate) fn record_download_bg(
    state: &Arc<AppState>,
    user: &UserRef,
    result: &SearchResult,
    magnet: &str,
) {
    let state = state.clone();
    let user = user.clone();
    let result = result.clone();
    let magnet = magnet.to_string();
    tokio::spawn(async move {
        if let Err(e) = state
            .store
            .record_download(
                user.id,
                &result.title,
                &magnet,
                &result.size,
                &result.seeders,
            )
            .await
        {
            state
                .logger
                .warning(&format!("record_download failed: {e}"), Some(&user))
                .await;
        }
    });
}
