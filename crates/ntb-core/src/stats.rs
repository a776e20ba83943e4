//! Persistence port: usage records and read-only statistics views.
//!
//! The store is a fire-and-forget collaborator from the search flow's point
//! of view; handlers spawn writes and log their failures instead of
//! surfacing them to the user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{UserId, UserRef};
use crate::Result;

#[derive(Clone, Debug, Default)]
pub struct UserStats {
    pub total_searches: i64,
    pub total_downloads: i64,
    pub today_searches: i64,
    pub today_downloads: i64,
    pub member_since: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default)]
pub struct BotStats {
    pub total_users: u64,
    pub active_users_7d: u64,
    pub total_searches: u64,
    pub total_downloads: u64,
    pub today_searches: u64,
    pub today_downloads: u64,
}

#[derive(Clone, Debug)]
pub struct SearchRecord {
    pub query: String,
    pub results_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct DownloadRecord {
    pub title: String,
    pub size: Option<String>,
    pub seeders: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct PopularSearch {
    pub query: String,
    pub count: i64,
    pub unique_users: i64,
}

/// Durable usage log, keyed by user id. Writes must tolerate concurrent
/// sessions; there is no cross-user invariant to preserve.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Upsert the user's profile and bump `last_seen`.
    async fn record_user(&self, user: &UserRef) -> Result<()>;

    async fn record_search(&self, user_id: UserId, query: &str, result_count: u64) -> Result<()>;

    async fn record_download(
        &self,
        user_id: UserId,
        title: &str,
        magnet: &str,
        size: &str,
        seeders: &str,
    ) -> Result<()>;

    /// `None` when the user has never been recorded.
    async fn user_stats(&self, user_id: UserId) -> Result<Option<UserStats>>;

    async fn bot_stats(&self) -> Result<BotStats>;

    async fn search_history(&self, user_id: UserId, limit: i64) -> Result<Vec<SearchRecord>>;

    async fn user_downloads(&self, user_id: UserId, limit: i64) -> Result<Vec<DownloadRecord>>;

    /// Most-searched queries inside the trailing `days` window.
    async fn popular_searches(&self, limit: i64, days: i64) -> Result<Vec<PopularSearch>>;
}
