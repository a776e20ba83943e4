use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Default browser-like User-Agent; nyaa serves different markup (or nothing)
/// to obvious non-browser agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub bot_token: String,

    // Search site
    pub search_base_url: String,
    pub http_timeout: Duration,
    pub user_agent: String,

    // Persistence
    pub mongodb_uri: String,
    pub mongodb_database: String,

    // Logging
    pub log_dir: PathBuf,
    pub log_channel_id: Option<i64>,

    // Stats views
    pub history_limit: usize,
    pub popular_window_days: i64,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("BOT_TOKEN environment variable is required".to_string())
        })?;

        let search_base_url = env_str("NYAA_BASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://nyaa.si".to_string());
        let search_base_url = search_base_url.trim_end_matches('/').to_string();

        let http_timeout = Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS").unwrap_or(30));
        let user_agent = env_str("USER_AGENT")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let mongodb_uri = env_str("MONGODB_URI")
            .and_then(non_empty)
            .unwrap_or_else(|| "mongodb://localhost:27017".to_string());
        let mongodb_database = env_str("MONGODB_DATABASE")
            .and_then(non_empty)
            .unwrap_or_else(|| "nyaa_bot".to_string());

        let log_dir = PathBuf::from(env_str("LOG_DIR").unwrap_or_else(|| "logs".to_string()));
        fs::create_dir_all(&log_dir)?;
        let log_channel_id = env_i64("LOG_CHANNEL_ID");

        let history_limit = env_usize("HISTORY_LIMIT").unwrap_or(10);
        let popular_window_days = env_i64("POPULAR_WINDOW_DAYS").unwrap_or(7).max(1);

        Ok(Self {
            bot_token,
            search_base_url,
            http_timeout,
            user_agent,
            mongodb_uri,
            mongodb_database,
            log_dir,
            log_channel_id,
            history_limit,
            popular_window_days,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
