use std::sync::Arc;

use ntb_core::{
    config::Config,
    logging::{BotLogger, ConsoleSink, FileSink},
    stats::StatsStore,
};
use ntb_store::MongoStatsStore;

#[tokio::main]
async fn main() -> Result<(), ntb_core::Error> {
    let cfg = Arc::new(Config::load()?);

    let logger = Arc::new(BotLogger::new("ntb"));
    logger.add_sink(Arc::new(ConsoleSink)).await;
    logger
        .add_sink(Arc::new(FileSink::new(cfg.log_dir.clone(), "ntb")))
        .await;
    logger.info("starting nyaa.si search bot", None).await;

    let store: Arc<dyn StatsStore> =
        match MongoStatsStore::connect(&cfg.mongodb_uri, &cfg.mongodb_database).await {
            Ok(store) => {
                logger
                    .info(&format!("connected to MongoDB: {}", cfg.mongodb_database), None)
                    .await;
                Arc::new(store)
            }
            Err(e) => {
                logger.error(&format!("MongoDB connection failed: {e}"), None).await;
                return Err(e);
            }
        };

    ntb_telegram::router::run_polling(cfg, store, logger)
        .await
        .map_err(|e| ntb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
