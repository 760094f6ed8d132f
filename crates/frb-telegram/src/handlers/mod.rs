//! Telegram update handlers.
//!
//! `handle_message` is the teloxide endpoint. It only unpacks the update; the
//! auth check and command routing in `dispatch` work on plain ids so they can
//! be exercised without a live bot.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use frb_core::{
    allowlist::AllowlistStore,
    domain::{ChatId, UserId},
};

use crate::router::AppState;

mod commands;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized. Contact the bot owner for access.";

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    let user_id = msg.from().map(|u| UserId(u.id.0 as i64));

    dispatch(&state, chat_id, user_id, msg.text()).await;
    Ok(())
}

/// Authorize the sender, then route the message text.
pub async fn dispatch(
    state: &AppState,
    chat_id: ChatId,
    user_id: Option<UserId>,
    text: Option<&str>,
) {
    if !is_authorized(&state.allowlist, chat_id, user_id) {
        warn!(
            chat_id = chat_id.0,
            user_id = user_id.map(|u| u.0),
            "unauthorized access attempt"
        );
        if let Err(e) = state.messenger.send_text(chat_id, UNAUTHORIZED_MESSAGE).await {
            warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
        }
        return;
    }

    commands::handle_command(state, chat_id, text.unwrap_or_default()).await;
}

/// Allowed when either the chat or the sending user is allowlisted.
pub fn is_authorized(
    allowlist: &AllowlistStore,
    chat_id: ChatId,
    user_id: Option<UserId>,
) -> bool {
    allowlist.is_allowed(chat_id.0) || user_id.is_some_and(|u| allowlist.is_allowed(u.0))
}
