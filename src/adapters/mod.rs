//! Adapter interfaces for external systems.
//!
//! Every network boundary the job touches sits behind a trait here so the
//! orchestrator can be driven by fakes in tests:
//! - [`FeedSource`]: reads the author feed (Bluesky)
//! - [`ImageFetcher`]: downloads image bytes
//! - [`ImageHost`]: re-hosts bytes at a public URL (ImgBB)
//! - [`MediaPlatform`]: container + publish calls (Instagram Graph API)

pub mod bluesky;
pub mod download;
pub mod imgbb;
pub mod instagram;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::Post;

pub use bluesky::BlueskyClient;
pub use download::HttpImageFetcher;
pub use imgbb::ImgbbClient;
pub use instagram::InstagramClient;

/// Errors raised at a network boundary
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Connection, timeout or body read failure
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The remote answered with a non-success status
    #[error("{service} rejected the request ({status}): {message}")]
    Rejected {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// Downloaded content is not an image
    #[error("Not an image at {url} (content-type: {content_type})")]
    NotAnImage { url: String, content_type: String },

    /// Success status but a body we cannot use
    #[error("{service} returned an unexpected response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

impl AdapterError {
    pub(crate) fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { service, source }
    }

    pub(crate) fn invalid(service: &'static str, message: impl ToString) -> Self {
        Self::InvalidResponse {
            service,
            message: message.to_string(),
        }
    }

    /// True for failures reported by the remote service itself
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Source of recent posts for an author
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Most recent posts of `actor`, newest first
    async fn fetch_recent_posts(&self, actor: &str, limit: u32) -> Result<Vec<Post>, AdapterError>;
}

/// Downloads raw image bytes
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>, AdapterError>;
}

/// Uploads image bytes and returns a publicly fetchable URL
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, bytes: &[u8]) -> Result<String, AdapterError>;
}

/// Destination platform media API (two-phase container → publish)
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    /// Create an image container. Carousel children carry no caption.
    async fn create_media_container(
        &self,
        image_url: &str,
        caption: Option<&str>,
        is_carousel_child: bool,
    ) -> Result<String, AdapterError>;

    /// Create a carousel container referencing child container ids, in order
    async fn create_carousel_container(
        &self,
        children: &[String],
        caption: &str,
    ) -> Result<String, AdapterError>;

    /// Publish a container, returning the published media id
    async fn publish(&self, container_id: &str) -> Result<String, AdapterError>;
}

/// Build the HTTP client of one adapter, surfacing builder failures
pub(crate) fn build_client(
    service: &'static str,
    builder: reqwest::ClientBuilder,
) -> Result<reqwest::Client, AdapterError> {
    builder.build().map_err(AdapterError::transport(service))
}

/// Turn a non-success response into [`AdapterError::Rejected`]
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AdapterError::Rejected {
        service,
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Best-effort extraction of a human readable message from an error body.
///
/// Understands `{"error": {"message": ..}}` (Graph API, ImgBB) and
/// `{"error": .., "message": ..}` (XRPC).
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let found = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("message"))
            .or_else(|| v.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    found.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "empty response body".to_string()
        } else {
            trimmed.chars().take(200).collect()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_reports_bad_settings() {
        let builder = reqwest::Client::builder().user_agent("bad\nagent");
        let err = build_client("image download", builder).unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Transport {
                service: "image download",
                ..
            }
        ));

        let ok = build_client("bluesky", reqwest::Client::builder());
        assert!(ok.is_ok());
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Invalid OAuth access token","code":190}}"#),
            "Invalid OAuth access token"
        );
        assert_eq!(
            error_message(r#"{"error":"InvalidRequest","message":"Profile not found"}"#),
            "Profile not found"
        );
        assert_eq!(error_message(r#"{"error":"AuthRequired"}"#), "AuthRequired");
        assert_eq!(error_message("  "), "empty response body");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
