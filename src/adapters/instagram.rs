//! Instagram Graph API content publishing.
//!
//! Publishing is two-phase: create a media container
//! (`POST /{account}/media`), then publish it (`POST /{account}/media_publish`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{build_client, ensure_success, AdapterError, MediaPlatform};

const SERVICE: &str = "instagram";

pub const DEFAULT_GRAPH_BASE: &str = "https://graph.facebook.com/v20.0";

/// Instagram Graph API client for one business account
pub struct InstagramClient {
    /// Graph API base including version, without trailing slash
    graph_base: String,
    /// Instagram business account id
    account_id: String,
    /// Long-lived access token
    access_token: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Body of `POST /{account}/media`
#[derive(Debug, Default, Serialize)]
struct ContainerRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_carousel_item: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<&'a [String]>,
    access_token: &'a str,
}

/// Body of `POST /{account}/media_publish`
#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    creation_id: &'a str,
    access_token: &'a str,
}

/// `{ "id": ... }` returned by both endpoints
#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

impl InstagramClient {
    pub fn new(
        graph_base: impl Into<String>,
        account_id: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AdapterError> {
        let client = build_client(SERVICE, reqwest::Client::builder().timeout(timeout))?;

        Ok(Self {
            graph_base: graph_base.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            access_token: access_token.into(),
            client,
        })
    }

    /// Build API URL
    fn api_url(&self, edge: &str) -> String {
        format!("{}/{}/{}", self.graph_base, self.account_id, edge)
    }

    async fn post_for_id<B: Serialize + Sync>(&self, edge: &str, body: &B) -> Result<String, AdapterError> {
        let response = self
            .client
            .post(self.api_url(edge))
            .json(body)
            .send()
            .await
            .map_err(AdapterError::transport(SERVICE))?;
        let response = ensure_success(SERVICE, response).await?;

        let created: IdResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::invalid(SERVICE, e))?;
        Ok(created.id)
    }
}

#[async_trait]
impl MediaPlatform for InstagramClient {
    async fn create_media_container(
        &self,
        image_url: &str,
        caption: Option<&str>,
        is_carousel_child: bool,
    ) -> Result<String, AdapterError> {
        let body = ContainerRequest {
            image_url: Some(image_url),
            caption: if is_carousel_child { None } else { caption },
            is_carousel_item: is_carousel_child,
            access_token: &self.access_token,
            ..Default::default()
        };
        self.post_for_id("media", &body).await
    }

    async fn create_carousel_container(
        &self,
        children: &[String],
        caption: &str,
    ) -> Result<String, AdapterError> {
        let body = ContainerRequest {
            caption: Some(caption),
            media_type: Some("CAROUSEL"),
            children: Some(children),
            access_token: &self.access_token,
            ..Default::default()
        };
        self.post_for_id("media", &body).await
    }

    async fn publish(&self, container_id: &str) -> Result<String, AdapterError> {
        let body = PublishRequest {
            creation_id: container_id,
            access_token: &self.access_token,
        };
        self.post_for_id("media_publish", &body).await
    }
}
