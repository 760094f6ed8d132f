use std::sync::Arc;

use anyhow::Context;
use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;
use tracing::info;

use frb_core::{
    allowlist::AllowlistStore, config::Config, messaging::port::MessagingPort,
    reboot::RebootWorkflow,
};

use crate::handlers;
use crate::TelegramMessenger;

pub struct AppState {
    pub allowlist: Arc<AllowlistStore>,
    pub workflow: Arc<RebootWorkflow>,
    pub messenger: Arc<dyn MessagingPort>,
    /// Upper bound for a single outbound message, in UTF-16 units.
    pub message_limit: usize,
    /// Cancelled at shutdown; each command runs under a child token.
    pub shutdown: CancellationToken,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    allowlist: Arc<AllowlistStore>,
    workflow: Arc<RebootWorkflow>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot
        .get_me()
        .await
        .context("telegram getMe failed, check TELEGRAM_BOT_TOKEN")?;
    info!(username = %me.username(), "bot started");
    info!(
        api = %cfg.api_base_url,
        club_id = cfg.club_id,
        pc_type = %cfg.pc_type,
        allowlisted = allowlist.snapshot().len(),
        "reboot target configured"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState {
        allowlist,
        workflow,
        messenger,
        message_limit: cfg.telegram_safe_limit,
        shutdown,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("dispatcher stopped");
    Ok(())
}
