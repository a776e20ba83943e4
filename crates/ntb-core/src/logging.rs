//! Multi-sink logging.
//!
//! Entries fan out to a fixed list of sinks (console, daily file, and
//! optionally a Telegram channel for errors). A sink's failure is reported
//! on stderr and never blocks or fails the other sinks.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::{
    domain::{ChatId, UserRef},
    formatting::{clamp_message, escape_html, SAFE_MESSAGE_LEN},
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    fn emoji(&self) -> &'static str {
        match self {
            Self::Debug => "🐛",
            Self::Info => "ℹ️",
            Self::Warning => "⚠️",
            Self::Error => "❌",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub logger: String,
    /// `"[user_id:…, username:…] "` when the entry has a user, else empty.
    pub context: String,
    pub message: String,
}

impl LogEntry {
    fn new(logger: &str, level: LogLevel, message: &str, user: Option<&UserRef>) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            level,
            logger: logger.to_string(),
            context: user_context(user),
            message: message.to_string(),
        }
    }

    /// The plain line format shared by console and file sinks.
    pub fn line(&self) -> String {
        format!(
            "{} - {} - {} - {}{}",
            self.timestamp,
            self.logger,
            self.level.as_str(),
            self.context,
            self.message
        )
    }
}

fn user_context(user: Option<&UserRef>) -> String {
    let Some(user) = user else {
        return String::new();
    };
    match &user.username {
        Some(name) => format!("[user_id:{}, username:{}] ", user.id.0, name),
        None => format!("[user_id:{}] ", user.id.0),
    }
}

/// A single log destination.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn write(&self, entry: &LogEntry) -> Result<()>;
}

/// Stdout for routine entries, stderr for warnings and errors.
pub struct ConsoleSink;

#[async_trait]
impl LogSink for ConsoleSink {
    async fn write(&self, entry: &LogEntry) -> Result<()> {
        if entry.level >= LogLevel::Warning {
            eprintln!("{}", entry.line());
        } else {
            println!("{}", entry.line());
        }
        Ok(())
    }
}

/// Appends to `{dir}/{name}_{YYYY-MM-DD}.log`; the name is recomputed per
/// write so the file rolls over at midnight.
pub struct FileSink {
    dir: PathBuf,
    name: String,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    fn current_path(&self) -> PathBuf {
        let day = Local::now().format("%Y-%m-%d");
        self.dir.join(format!("{}_{}.log", self.name, day))
    }
}

#[async_trait]
impl LogSink for FileSink {
    async fn write(&self, entry: &LogEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_path())?;
        writeln!(file, "{}", entry.line())?;
        Ok(())
    }
}

/// Forwards Error-and-above entries to a Telegram channel.
///
/// Repeats of the same message within the dedupe window are suppressed so a
/// tight failure loop cannot flood the channel.
pub struct ChannelSink {
    messenger: Arc<dyn MessagingPort>,
    channel: ChatId,
    min_level: LogLevel,
    window: Duration,
    recent: Mutex<HashMap<u64, Instant>>,
}

impl ChannelSink {
    pub fn new(messenger: Arc<dyn MessagingPort>, channel: ChatId) -> Self {
        Self {
            messenger,
            channel,
            min_level: LogLevel::Error,
            window: Duration::from_secs(5),
            recent: Mutex::new(HashMap::new()),
        }
    }

    async fn should_send(&self, entry: &LogEntry) -> bool {
        let mut hasher = DefaultHasher::new();
        entry.message.hash(&mut hasher);
        let key = hasher.finish();

        let now = Instant::now();
        let mut recent = self.recent.lock().await;
        if let Some(last) = recent.get(&key) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }
        recent.insert(key, now);
        true
    }
}

#[async_trait]
impl LogSink for ChannelSink {
    async fn write(&self, entry: &LogEntry) -> Result<()> {
        if entry.level < self.min_level {
            return Ok(());
        }
        if !self.should_send(entry).await {
            return Ok(());
        }

        let html = format!(
            "{} <b>{}</b>\n⏰ <code>{}</code>\n📍 <code>{}</code>\n\n<pre>{}{}</pre>",
            entry.level.emoji(),
            entry.level.as_str(),
            entry.timestamp,
            escape_html(&entry.logger),
            escape_html(&entry.context),
            escape_html(&entry.message),
        );
        self.messenger
            .send_html(self.channel, &clamp_message(&html, SAFE_MESSAGE_LEN))
            .await?;
        Ok(())
    }
}

/// Fan-out logger with user-context helpers.
///
/// The sink list grows at runtime: the channel sink can only be registered
/// once the messenger exists.
pub struct BotLogger {
    name: String,
    sinks: RwLock<Vec<Arc<dyn LogSink>>>,
}

impl BotLogger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sinks: RwLock::new(Vec::new()),
        }
    }

    pub async fn add_sink(&self, sink: Arc<dyn LogSink>) {
        self.sinks.write().await.push(sink);
    }

    pub async fn log(&self, level: LogLevel, message: &str, user: Option<&UserRef>) {
        let entry = LogEntry::new(&self.name, level, message, user);
        let sinks = self.sinks.read().await.clone();
        for sink in sinks {
            if let Err(e) = sink.write(&entry).await {
                eprintln!("log sink failed: {e}");
            }
        }
    }

    pub async fn debug(&self, message: &str, user: Option<&UserRef>) {
        self.log(LogLevel::Debug, message, user).await;
    }

    pub async fn info(&self, message: &str, user: Option<&UserRef>) {
        self.log(LogLevel::Info, message, user).await;
    }

    pub async fn warning(&self, message: &str, user: Option<&UserRef>) {
        self.log(LogLevel::Warning, message, user).await;
    }

    pub async fn error(&self, message: &str, user: Option<&UserRef>) {
        self.log(LogLevel::Error, message, user).await;
    }

    /// Analytics lines for user-visible actions (searches, downloads).
    pub async fn user_action(&self, action: &str, user: &UserRef, details: &str) {
        self.info(&format!("USER_ACTION: {action} - {details}"), Some(user))
            .await;
    }
}
