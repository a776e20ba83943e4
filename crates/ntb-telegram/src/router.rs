use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use ntb_core::{
    config::Config,
    domain::ChatId,
    logging::{BotLogger, ChannelSink},
    messaging::port::MessagingPort,
    nyaa::NyaaClient,
    session::SessionStore,
    stats::StatsStore,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub nyaa: Arc<NyaaClient>,
    pub sessions: Arc<SessionStore>,
    pub store: Arc<dyn StatsStore>,
    pub messenger: Arc<dyn MessagingPort>,
    pub logger: Arc<BotLogger>,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    store: Arc<dyn StatsStore>,
    logger: Arc<BotLogger>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    match bot.get_me().await {
        Ok(me) => {
            logger
                .info(&format!("ntb started: @{}", me.username()), None)
                .await
        }
        Err(e) => logger.warning(&format!("get_me failed: {e}"), None).await,
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    // The channel sink can only exist once the bot does.
    if let Some(channel) = cfg.log_channel_id {
        logger
            .add_sink(Arc::new(ChannelSink::new(
                messenger.clone(),
                ChatId(channel),
            )))
            .await;
        logger
            .info(&format!("error log channel enabled: {channel}"), None)
            .await;
    }

    let state = Arc::new(AppState {
        nyaa: Arc::new(NyaaClient::new(&cfg)?),
        sessions: Arc::new(SessionStore::new()),
        cfg,
        store,
        messenger,
        logger: logger.clone(),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    // Ctrl-C stops polling and drains in-flight handlers before we return.
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    logger.info("ntb stopped", None).await;
    Ok(())
}
