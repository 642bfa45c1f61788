//! ImgBB image hosting.
//!
//! The destination platform only accepts images by URL, so bytes we produce
//! or re-upload are hosted here first.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::multipart::Form;
use serde::Deserialize;

use super::{build_client, ensure_success, AdapterError, ImageHost};

const SERVICE: &str = "imgbb";

pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.imgbb.com/1/upload";

/// ImgBB upload client
pub struct ImgbbClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: String,
}

impl ImgbbClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AdapterError> {
        let client = build_client(SERVICE, reqwest::Client::builder().timeout(timeout))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl ImageHost for ImgbbClient {
    async fn upload(&self, bytes: &[u8]) -> Result<String, AdapterError> {
        let form = Form::new().text("image", STANDARD.encode(bytes));

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(AdapterError::transport(SERVICE))?;
        let response = ensure_success(SERVICE, response).await?;

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::invalid(SERVICE, e))?;

        if uploaded.data.url.is_empty() {
            return Err(AdapterError::invalid(SERVICE, "upload returned an empty url"));
        }
        Ok(uploaded.data.url)
    }
}
