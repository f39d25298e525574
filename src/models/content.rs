use serde::{Deserialize, Serialize};

/// Identifier of a stored content item
pub type ContentId = i64;

/// A video in a genre's candidate pool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct ContentItem {
    pub id: ContentId,
    pub genre: String,
    pub title: String,
    pub url: String,
}

/// A search result that has not been persisted yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}
