//! Per-user transient search state.
//!
//! One `SearchSession` per active conversation, replaced wholesale by every
//! new search and gone on process restart. The store hands out `PageView`s
//! instead of raw state so handlers cannot hold references across awaits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::domain::{SearchResult, UserId};
use crate::pagination::{self, PageView};

#[derive(Clone, Debug)]
pub struct SearchSession {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub current_page: usize,
    /// Store-wide monotonic stamp; bumped whenever the session is replaced.
    /// In-flight fetches carry the stamp they started under so their output
    /// can be discarded if a newer search landed meanwhile.
    pub generation: u64,
}

/// A selected result plus enough context to render and to detect staleness.
#[derive(Clone, Debug)]
pub struct Selection {
    pub result: SearchResult,
    pub query: String,
    pub current_page: usize,
    pub generation: u64,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, SearchSession>>,
    generations: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the user's session with a fresh search at page 0.
    ///
    /// Returns the page-0 view, or `None` when the search came back empty
    /// (the empty session still replaces the old one).
    pub async fn start_search(
        &self,
        user: UserId,
        query: &str,
        results: Vec<SearchResult>,
    ) -> Option<PageView> {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let view = pagination::paginate(query, &results, 0, generation);

        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            user,
            SearchSession {
                query: query.to_string(),
                results,
                current_page: 0,
                generation,
            },
        );
        view
    }

    /// Move to `page` and return its view; out-of-range or sessionless
    /// requests are ignored and leave the state untouched.
    pub async fn go_to_page(&self, user: UserId, page: usize) -> Option<PageView> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&user)?;

        let view = pagination::paginate(&session.query, &session.results, page, session.generation)?;
        session.current_page = page;
        Some(view)
    }

    /// Resolve a global result index against the most recent search.
    pub async fn select(&self, user: UserId, index: usize) -> Option<Selection> {
        let sessions = self.sessions.lock().await;
        let session = sessions.get(&user)?;
        let result = session.results.get(index)?.clone();
        Some(Selection {
            result,
            query: session.query.clone(),
            current_page: session.current_page,
            generation: session.generation,
        })
    }

    /// Current generation stamp, if the user has a session.
    pub async fn generation(&self, user: UserId) -> Option<u64> {
        let sessions = self.sessions.lock().await;
        sessions.get(&user).map(|s| s.generation)
    }

    /// Explicit reset ("New search" button): discards the session.
    pub async fn clear(&self, user: UserId) -> bool {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(&user).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PAGE_SIZE;

    const USER: UserId = UserId(42);

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult {
                title: format!("result {i}"),
                detail_url: format!("https://nyaa.si/view/{i}"),
                size: "1 GiB".to_string(),
                seeders: "1".to_string(),
                leechers: "0".to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn new_search_replaces_results_and_resets_page() {
        let store = SessionStore::new();

        let v = store.start_search(USER, "one", results(12)).await.unwrap();
        assert_eq!(v.page, 0);
        store.go_to_page(USER, 2).await.unwrap();

        let v = store.start_search(USER, "two", results(3)).await.unwrap();
        assert_eq!(v.page, 0);
        assert_eq!(v.total, 3);
        assert_eq!(v.query, "two");
    }

    #[tokio::test]
    async fn empty_search_still_replaces_the_old_session() {
        let store = SessionStore::new();
        store.start_search(USER, "one", results(8)).await.unwrap();

        assert!(store.start_search(USER, "two", Vec::new()).await.is_none());
        assert!(store.select(USER, 0).await.is_none());
        assert!(store.go_to_page(USER, 0).await.is_none());
    }

    #[tokio::test]
    async fn selection_is_by_global_index_regardless_of_page() {
        let store = SessionStore::new();
        store.start_search(USER, "q", results(12)).await.unwrap();
        store.go_to_page(USER, 2).await.unwrap();

        let sel = store.select(USER, 3).await.unwrap();
        assert_eq!(sel.result.title, "result 3");
        assert_eq!(sel.current_page, 2);

        assert!(store.select(USER, 12).await.is_none());
    }

    #[tokio::test]
    async fn out_of_range_navigation_is_ignored() {
        let store = SessionStore::new();
        store.start_search(USER, "q", results(6)).await.unwrap();
        store.go_to_page(USER, 1).await.unwrap();

        assert!(store.go_to_page(USER, 7).await.is_none());
        // State untouched by the rejected move.
        let sel = store.select(USER, 0).await.unwrap();
        assert_eq!(sel.current_page, 1);
    }

    #[tokio::test]
    async fn generation_changes_when_the_session_is_replaced() {
        let store = SessionStore::new();
        store.start_search(USER, "one", results(6)).await.unwrap();
        let g1 = store.generation(USER).await.unwrap();

        let stale = store.select(USER, 0).await.unwrap();

        store.start_search(USER, "two", results(6)).await.unwrap();
        let g2 = store.generation(USER).await.unwrap();

        assert!(g2 > g1);
        assert_ne!(stale.generation, g2);
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_user() {
        let store = SessionStore::new();
        store.start_search(UserId(1), "a", results(6)).await.unwrap();
        store
            .start_search(UserId(2), "b", results(2 * PAGE_SIZE + 1))
            .await
            .unwrap();

        store.go_to_page(UserId(2), 2).await.unwrap();
        assert_eq!(store.select(UserId(1), 0).await.unwrap().current_page, 0);
        assert!(store.clear(UserId(1)).await);
        assert!(store.select(UserId(2), 0).await.is_some());
    }
}
