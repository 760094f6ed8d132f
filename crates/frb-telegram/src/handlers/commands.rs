use tracing::{debug, error, info, warn};

use frb_core::{domain::ChatId, errors::Error, messaging::types::ChatAction};

use crate::router::AppState;

pub const HELP_TEXT: &str = "Free PC reboot bot\n\n\
/free_reboot - reboot every free PC and report the result per device\n\
/start - show this help";

pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command. Send /start to see what I can do.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    FreeReboot,
    Unknown,
}

impl BotCommand {
    /// Telegram may send `/cmd@botname arg1 ...`; anything that is not a
    /// known command (including plain text) is `Unknown`.
    pub fn parse(text: &str) -> Self {
        let first = text.split_whitespace().next().unwrap_or("");
        let Some(name) = first.strip_prefix('/') else {
            return BotCommand::Unknown;
        };
        let name = name.split('@').next().unwrap_or("").to_lowercase();

        match name.as_str() {
            "start" => BotCommand::Start,
            "free_reboot" => BotCommand::FreeReboot,
            _ => BotCommand::Unknown,
        }
    }
}

pub async fn handle_command(state: &AppState, chat_id: ChatId, text: &str) {
    match BotCommand::parse(text) {
        BotCommand::Start => send(state, chat_id, HELP_TEXT).await,
        BotCommand::FreeReboot => free_reboot(state, chat_id).await,
        BotCommand::Unknown => send(state, chat_id, UNKNOWN_COMMAND_TEXT).await,
    }
}

async fn free_reboot(state: &AppState, chat_id: ChatId) {
    info!(chat_id = chat_id.0, "free reboot requested");

    let caps = state.messenger.capabilities();
    if caps.supports_chat_actions {
        if let Err(e) = state
            .messenger
            .send_chat_action(chat_id, ChatAction::Typing)
            .await
        {
            debug!(chat_id = chat_id.0, error = %e, "failed to send typing action");
        }
    }

    let cancel = state.shutdown.child_token();
    let messages = match state.workflow.run(&cancel).await {
        Ok(report) => report.into_messages(state.message_limit.min(caps.max_message_len)),
        Err(Error::Cancelled) => {
            vec!["Reboot request cancelled, the bot is shutting down.".to_string()]
        }
        Err(e) => {
            error!(chat_id = chat_id.0, error = %e, "free reboot failed");
            vec![format!("Reboot request failed: {e}")]
        }
    };

    for message in messages {
        send(state, chat_id, &message).await;
    }
}

async fn send(state: &AppState, chat_id: ChatId, text: &str) {
    if let Err(e) = state.messenger.send_text(chat_id, text).await {
        warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
    }
}
