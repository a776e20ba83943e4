//! MongoDB implementation of the `StatsStore` port.
//!
//! Layout mirrors the bot's history: a `users` collection upserted by
//! `user_id`, plus append-only `search_history` and `downloads` collections
//! stamped with `created_at`. All time windows use calendar arithmetic.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Bson, DateTime as BsonDateTime, Document},
    options::{ClientOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use ntb_core::{
    domain::{UserId, UserRef},
    stats::{BotStats, DownloadRecord, PopularSearch, SearchRecord, StatsStore, UserStats},
    Error, Result,
};

/// Collection names as constants for consistency.
mod collections {
    pub const USERS: &str = "users";
    pub const SEARCH_HISTORY: &str = "search_history";
    pub const DOWNLOADS: &str = "downloads";
}

#[derive(Debug, Serialize, Deserialize)]
struct SearchDoc {
    user_id: i64,
    query: String,
    #[serde(default)]
    results_count: i64,
    created_at: BsonDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
struct DownloadDoc {
    user_id: i64,
    title: String,
    magnet_link: String,
    size: Option<String>,
    seeders: Option<String>,
    created_at: BsonDateTime,
}

#[derive(Clone, Debug)]
pub struct MongoStatsStore {
    db: Database,
}

impl MongoStatsStore {
    /// Connect, ping, and make sure the indexes exist.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri).await.map_err(store_err)?;
        let client = Client::with_options(options).map_err(store_err)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(store_err)?;

        let store = Self {
            db: client.database(db_name),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    fn users(&self) -> Collection<Document> {
        self.db.collection(collections::USERS)
    }

    fn searches(&self) -> Collection<SearchDoc> {
        self.db.collection(collections::SEARCH_HISTORY)
    }

    fn downloads(&self) -> Collection<DownloadDoc> {
        self.db.collection(collections::DOWNLOADS)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let unique = IndexOptions::builder().unique(true).build();
        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1 })
                    .options(unique)
                    .build(),
            )
            .await
            .map_err(store_err)?;

        self.searches()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "created_at": -1 })
                    .build(),
            )
            .await
            .map_err(store_err)?;
        self.searches()
            .create_index(IndexModel::builder().keys(doc! { "query": 1 }).build())
            .await
            .map_err(store_err)?;

        self.downloads()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "created_at": -1 })
                    .build(),
            )
            .await
            .map_err(store_err)?;

        Ok(())
    }
}

#[async_trait]
impl StatsStore for MongoStatsStore {
    async fn record_user(&self, user: &UserRef) -> Result<()> {
        let now = BsonDateTime::now();
        let profile = doc! {
            "user_id": user.id.0,
            "username": opt_bson(&user.username)?,
            "first_name": opt_bson(&user.first_name)?,
            "last_name": opt_bson(&user.last_name)?,
            "last_seen": now,
            "updated_at": now,
        };

        self.users()
            .update_one(
                doc! { "user_id": user.id.0 },
                doc! {
                    "$set": profile,
                    "$setOnInsert": {
                        "created_at": now,
                        "total_searches": 0i64,
                        "total_downloads": 0i64,
                    },
                },
            )
            .upsert(true)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn record_search(&self, user_id: UserId, query: &str, result_count: u64) -> Result<()> {
        self.searches()
            .insert_one(&SearchDoc {
                user_id: user_id.0,
                query: query.to_string(),
                results_count: result_count as i64,
                created_at: BsonDateTime::now(),
            })
            .await
            .map_err(store_err)?;

        self.users()
            .update_one(
                doc! { "user_id": user_id.0 },
                doc! { "$inc": { "total_searches": 1i64 } },
            )
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn record_download(
        &self,
        user_id: UserId,
        title: &str,
        magnet: &str,
        size: &str,
        seeders: &str,
    ) -> Result<()> {
        self.downloads()
            .insert_one(&DownloadDoc {
                user_id: user_id.0,
                title: title.to_string(),
                magnet_link: magnet.to_string(),
                size: Some(size.to_string()),
                seeders: Some(seeders.to_string()),
                created_at: BsonDateTime::now(),
            })
            .await
            .map_err(store_err)?;

        self.users()
            .update_one(
                doc! { "user_id": user_id.0 },
                doc! { "$inc": { "total_downloads": 1i64 } },
            )
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn user_stats(&self, user_id: UserId) -> Result<Option<UserStats>> {
        let Some(user) = self
            .users()
            .find_one(doc! { "user_id": user_id.0 })
            .await
            .map_err(store_err)?
        else {
            return Ok(None);
        };

        let today = to_bson_date(day_start(Utc::now()));
        let today_filter = doc! { "user_id": user_id.0, "created_at": { "$gte": today } };

        let today_searches = self
            .searches()
            .count_documents(today_filter.clone())
            .await
            .map_err(store_err)? as i64;
        let today_downloads = self
            .downloads()
            .count_documents(today_filter)
            .await
            .map_err(store_err)? as i64;

        Ok(Some(UserStats {
            total_searches: doc_i64(&user, "total_searches"),
            total_downloads: doc_i64(&user, "total_downloads"),
            today_searches,
            today_downloads,
            member_since: doc_date(&user, "created_at"),
            last_seen: doc_date(&user, "last_seen"),
        }))
    }

    async fn bot_stats(&self) -> Result<BotStats> {
        let now = Utc::now();
        let today = to_bson_date(day_start(now));
        let week_ago = to_bson_date(window_cutoff(now, 7));

        let total_users = self
            .users()
            .count_documents(doc! {})
            .await
            .map_err(store_err)?;
        let active_users_7d = self
            .users()
            .count_documents(doc! { "last_seen": { "$gte": week_ago } })
            .await
            .map_err(store_err)?;
        let total_searches = self
            .searches()
            .count_documents(doc! {})
            .await
            .map_err(store_err)?;
        let total_downloads = self
            .downloads()
            .count_documents(doc! {})
            .await
            .map_err(store_err)?;
        let today_searches = self
            .searches()
            .count_documents(doc! { "created_at": { "$gte": today } })
            .await
            .map_err(store_err)?;
        let today_downloads = self
            .downloads()
            .count_documents(doc! { "created_at": { "$gte": today } })
            .await
            .map_err(store_err)?;

        Ok(BotStats {
            total_users,
            active_users_7d,
            total_searches,
            total_downloads,
            today_searches,
            today_downloads,
        })
    }

    async fn search_history(&self, user_id: UserId, limit: i64) -> Result<Vec<SearchRecord>> {
        let cursor = self
            .searches()
            .find(doc! { "user_id": user_id.0 })
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await
            .map_err(store_err)?;
        let docs: Vec<SearchDoc> = cursor.try_collect().await.map_err(store_err)?;

        Ok(docs
            .into_iter()
            .map(|d| SearchRecord {
                query: d.query,
                results_count: d.results_count,
                created_at: from_bson_date(d.created_at),
            })
            .collect())
    }

    async fn user_downloads(&self, user_id: UserId, limit: i64) -> Result<Vec<DownloadRecord>> {
        let cursor = self
            .downloads()
            .find(doc! { "user_id": user_id.0 })
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await
            .map_err(store_err)?;
        let docs: Vec<DownloadDoc> = cursor.try_collect().await.map_err(store_err)?;

        Ok(docs
            .into_iter()
            .map(|d| DownloadRecord {
                title: d.title,
                size: d.size,
                seeders: d.seeders,
                created_at: from_bson_date(d.created_at),
            })
            .collect())
    }

    async fn popular_searches(&self, limit: i64, days: i64) -> Result<Vec<PopularSearch>> {
        let cutoff = to_bson_date(window_cutoff(Utc::now(), days));
        let cursor = self
            .searches()
            .aggregate(popular_pipeline(cutoff, limit))
            .await
            .map_err(store_err)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(store_err)?;

        Ok(docs
            .into_iter()
            .filter_map(|d| {
                Some(PopularSearch {
                    query: d.get_str("query").ok()?.to_string(),
                    count: doc_i64(&d, "count"),
                    unique_users: doc_i64(&d, "unique_users"),
                })
            })
            .collect())
    }
}

/// Aggregation over `search_history`: window match, group by query with a
/// distinct-user set, then rank by volume.
fn popular_pipeline(cutoff: BsonDateTime, limit: i64) -> Vec<Document> {
    vec![
        doc! { "$match": { "created_at": { "$gte": cutoff } } },
        doc! { "$group": {
            "_id": "$query",
            "count": { "$sum": 1 },
            "unique_users": { "$addToSet": "$user_id" },
        } },
        doc! { "$project": {
            "query": "$_id",
            "count": 1,
            "unique_users": { "$size": "$unique_users" },
        } },
        doc! { "$sort": { "count": -1 } },
        doc! { "$limit": limit },
    ]
}

/// Midnight UTC of the given instant's day.
fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// `days` ago as a real calendar offset; safe across month starts.
fn window_cutoff(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

fn to_bson_date(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

fn from_bson_date(dt: BsonDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn doc_i64(doc: &Document, key: &str) -> i64 {
    doc.get_i64(key)
        .or_else(|_| doc.get_i32(key).map(i64::from))
        .unwrap_or(0)
}

fn doc_date(doc: &Document, key: &str) -> Option<DateTime<Utc>> {
    doc.get_datetime(key).ok().map(|d| from_bson_date(*d))
}

fn opt_bson(value: &Option<String>) -> Result<Bson> {
    to_bson(value).map_err(|e| Error::Store(e.to_string()))
}

fn store_err(e: mongodb::error::Error) -> Error {
    Error::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_start_is_midnight_of_the_same_day() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 15, 42, 9).unwrap();
        assert_eq!(
            day_start(now),
            Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn window_cutoff_crosses_month_boundaries() {
        // Day-of-month subtraction would underflow here; calendar arithmetic
        // lands in the previous month.
        let now = Utc.with_ymd_and_hms(2026, 7, 3, 12, 0, 0).unwrap();
        assert_eq!(
            window_cutoff(now, 7),
            Utc.with_ymd_and_hms(2026, 6, 26, 12, 0, 0).unwrap()
        );

        let new_year = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(
            window_cutoff(new_year, 7),
            Utc.with_ymd_and_hms(2025, 12, 26, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn bson_date_round_trips_to_the_millisecond() {
        let dt = Utc.with_ymd_and_hms(2026, 8, 7, 1, 2, 3).unwrap();
        assert_eq!(from_bson_date(to_bson_date(dt)), dt);
    }

    #[test]
    fn popular_pipeline_matches_window_then_groups() {
        let cutoff = to_bson_date(Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
        let pipeline = popular_pipeline(cutoff, 10);
        assert_eq!(pipeline.len(), 5);

        let matcher = pipeline[0].get_document("$match").unwrap();
        assert!(matcher
            .get_document("created_at")
            .unwrap()
            .contains_key("$gte"));

        let group = pipeline[1].get_document("$group").unwrap();
        assert_eq!(group.get_str("_id").unwrap(), "$query");

        let limit = pipeline[4].get_i64("$limit").unwrap();
        assert_eq!(limit, 10);
    }

    #[test]
    fn doc_i64_accepts_both_integer_widths() {
        let d = doc! { "a": 5i32, "b": 7i64 };
        assert_eq!(doc_i64(&d, "a"), 5);
        assert_eq!(doc_i64(&d, "b"), 7);
        assert_eq!(doc_i64(&d, "missing"), 0);
    }
}
