//! Bluesky author feed reader.
//!
//! Calls `app.bsky.feed.getAuthorFeed` and maps each feed item to a [`Post`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{build_client, ensure_success, AdapterError, FeedSource};
use crate::domain::{ImageRef, Post};

const SERVICE: &str = "bluesky";

/// Default public AppView endpoint
pub const DEFAULT_FEED_ENDPOINT: &str =
    "https://public.api.bsky.app/xrpc/app.bsky.feed.getAuthorFeed";

/// Bluesky feed client
pub struct BlueskyClient {
    /// Full getAuthorFeed URL
    endpoint: String,
    /// Bearer token (the public AppView accepts anonymous reads)
    api_key: Option<String>,
    /// HTTP client
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AuthorFeed {
    #[serde(default)]
    feed: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    post: PostView,
}

#[derive(Debug, Deserialize)]
struct PostView {
    cid: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    record: PostRecord,
    #[serde(default)]
    embed: Option<EmbedView>,
}

#[derive(Debug, Default, Deserialize)]
struct PostRecord {
    #[serde(default)]
    text: String,
}

/// Covers both `embed.images#view` and `embed.recordWithMedia#view`
#[derive(Debug, Deserialize)]
struct EmbedView {
    #[serde(default)]
    images: Vec<ImageView>,
    #[serde(default)]
    media: Option<Box<EmbedView>>,
}

#[derive(Debug, Deserialize)]
struct ImageView {
    fullsize: String,
    #[serde(default)]
    alt: String,
}

impl EmbedView {
    fn into_images(self) -> Vec<ImageView> {
        if !self.images.is_empty() {
            return self.images;
        }
        self.media.map(|m| m.into_images()).unwrap_or_default()
    }
}

impl From<PostView> for Post {
    fn from(view: PostView) -> Self {
        let images = view
            .embed
            .map(EmbedView::into_images)
            .unwrap_or_default()
            .into_iter()
            .map(|i| ImageRef {
                fullsize_url: i.fullsize,
                alt: i.alt,
            })
            .collect();

        Post {
            id: view.cid,
            uri: view.uri,
            text: view.record.text,
            images,
        }
    }
}

impl BlueskyClient {
    /// Create a new feed client
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AdapterError> {
        let client = build_client(SERVICE, reqwest::Client::builder().timeout(timeout))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }
}

#[async_trait]
impl FeedSource for BlueskyClient {
    async fn fetch_recent_posts(&self, actor: &str, limit: u32) -> Result<Vec<Post>, AdapterError> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("actor", actor.to_string()), ("limit", limit.to_string())]);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(AdapterError::transport(SERVICE))?;
        let response = ensure_success(SERVICE, response).await?;

        let feed: AuthorFeed = response
            .json()
            .await
            .map_err(|e| AdapterError::invalid(SERVICE, e))?;

        debug!(actor, count = feed.feed.len(), "Fetched author feed");
        Ok(feed.feed.into_iter().map(|item| item.post.into()).collect())
    }
}
