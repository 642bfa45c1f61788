//! Image downloads from public URLs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::{build_client, ensure_success, AdapterError, ImageFetcher};

const SERVICE: &str = "image download";

/// Some CDNs refuse requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Downloads images over HTTP, refusing anything that is not `image/*`
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AdapterError> {
        let builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT);

        Ok(Self {
            client: build_client(SERVICE, builder)?,
        })
    }
}

/// True if the content-type header names an image
fn is_image_content_type(content_type: &str) -> bool {
    content_type.trim().to_ascii_lowercase().starts_with("image/")
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn download(&self, url: &str) -> Result<Vec<u8>, AdapterError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AdapterError::transport(SERVICE))?;
        let response = ensure_success(SERVICE, response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !is_image_content_type(&content_type) {
            return Err(AdapterError::NotAnImage {
                url: url.to_string(),
                content_type,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(AdapterError::transport(SERVICE))?;
        Ok(bytes.to_vec())
    }
}
