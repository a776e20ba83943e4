use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Identity of the user behind an update, as far as Telegram tells us.
///
/// Passed to the stats store and the logger; never stored in session state.
#[derive(Clone, Debug)]
pub struct UserRef {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserRef {
    /// Short display handle for logs: username if present, else the numeric id.
    pub fn handle(&self) -> String {
        match &self.username {
            Some(u) => u.clone(),
            None => self.id.0.to_string(),
        }
    }
}

/// One row scraped from a search-results page.
///
/// Size/seeders/leechers are kept as the site-provided free-form strings;
/// the scrape degrades to placeholders instead of failing a whole page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub detail_url: String,
    pub size: String,
    pub seeders: String,
    pub leechers: String,
}
