//! YouTube Data API provider
//!
//! Uses the `/search` endpoint restricted to videos. Each result becomes a
//! `SearchHit` whose URL is the public watch page for the video id.

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::SearchHit,
    services::providers::ContentSearcher,
};
use reqwest::Client as HttpClient;
use serde::Deserialize;

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

#[derive(Clone)]
pub struct YouTubeSearcher {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    /// Optional response cache with its TTL in seconds
    cache: Option<(Cache, u64)>,
}

/// Search response from GET /search
#[derive(Debug, Deserialize)]
pub struct YouTubeSearchResponse {
    #[serde(default)]
    pub items: Vec<YouTubeSearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct YouTubeSearchItem {
    pub id: YouTubeItemId,
    pub snippet: YouTubeSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeItemId {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YouTubeSnippet {
    pub title: String,
}

impl YouTubeSearchResponse {
    /// Converts search items to hits, skipping items without a video id
    pub fn into_hits(self) -> Vec<SearchHit> {
        self.items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(SearchHit::new(
                    item.snippet.title,
                    format!("{}{}", WATCH_URL_PREFIX, video_id),
                ))
            })
            .collect()
    }
}

impl YouTubeSearcher {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache: None,
        }
    }

    /// Caches raw search results in Redis for `ttl` seconds
    pub fn with_cache(mut self, cache: Cache, ttl: u64) -> Self {
        self.cache = Some((cache, ttl));
        self
    }

    async fn fetch(&self, genre: &str, max_results: u32) -> AppResult<Vec<SearchHit>> {
        let url = format!("{}/search", self.api_url.trim_end_matches('/'));
        let max_results = max_results.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("part", "snippet"),
                ("type", "video"),
                ("q", genre),
                ("maxResults", max_results.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                genre = %genre,
                status = %status,
                body = %body,
                "YouTube search request failed"
            );
            return Err(AppError::ContentFetchFailed(format!(
                "YouTube API returned status {}: {}",
                status, body
            )));
        }

        let search: YouTubeSearchResponse = response.json().await?;
        let hits = search.into_hits();

        tracing::info!(
            genre = %genre,
            results = hits.len(),
            provider = "youtube",
            "Video search completed"
        );

        Ok(hits)
    }
}

#[async_trait::async_trait]
impl ContentSearcher for YouTubeSearcher {
    async fn search(&self, genre: &str, max_results: u32) -> AppResult<Vec<SearchHit>> {
        if genre.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search genre cannot be empty".to_string(),
            ));
        }

        match &self.cache {
            Some((cache, ttl)) => {
                // An empty result is often transient; keep retrying it upstream
                cached!(
                    cache,
                    CacheKey::VideoSearch {
                        genre: genre.to_string(),
                        max_results,
                    },
                    *ttl,
                    self.fetch(genre, max_results),
                    keep_if = |hits: &Vec<SearchHit>| !hits.is_empty()
                )
            }
            None => self.fetch(genre, max_results).await,
        }
    }

    fn name(&self) -> &'static str {
        "youtube"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_deserialization() {
        let json = r#"{
            "kind": "youtube#searchListResponse",
            "items": [
                {
                    "kind": "youtube#searchResult",
                    "id": { "kind": "youtube#video", "videoId": "dQw4w9WgXcQ" },
                    "snippet": { "title": "Rust in 100 Seconds", "channelTitle": "Fireship" }
                },
                {
                    "kind": "youtube#searchResult",
                    "id": { "kind": "youtube#video", "videoId": "5C_HPTJg5ek" },
                    "snippet": { "title": "Async Rust Explained" }
                }
            ]
        }"#;

        let response: YouTubeSearchResponse = serde_json::from_str(json).unwrap();
        let hits = response.into_hits();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Rust in 100 Seconds");
        assert_eq!(hits[0].url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(hits[1].url, "https://www.youtube.com/watch?v=5C_HPTJg5ek");
    }

    #[test]
    fn test_items_without_video_id_are_skipped() {
        let json = r#"{
            "items": [
                {
                    "id": { "kind": "youtube#channel", "channelId": "UC123" },
                    "snippet": { "title": "A channel" }
                },
                {
                    "id": { "kind": "youtube#video", "videoId": "abc" },
                    "snippet": { "title": "A video" }
                }
            ]
        }"#;

        let response: YouTubeSearchResponse = serde_json::from_str(json).unwrap();
        let hits = response.into_hits();

        assert_eq!(
            hits,
            vec![SearchHit::new("A video", "https://www.youtube.com/watch?v=abc")]
        );
    }

    #[test]
    fn test_missing_items_is_empty() {
        let response: YouTubeSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_hits().is_empty());
    }

    #[tokio::test]
    async fn test_search_rejects_blank_genre() {
        let searcher = YouTubeSearcher::new("key".to_string(), "http://test.local".to_string());
        let result = searcher.search("   ", 5).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_an_error() {
        // Port 9 (discard) is not expected to serve HTTP
        let searcher = YouTubeSearcher::new("key".to_string(), "http://127.0.0.1:9".to_string());
        assert!(searcher.search("Tech", 5).await.is_err());
    }
}
