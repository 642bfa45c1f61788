//! Media publishing on the destination platform.
//!
//! Every publish ends with the same two-phase sequence: create a container,
//! then publish it. A post only counts as published when that final call
//! succeeds. Any earlier failure returns before anything is published, so
//! there is never a partial post.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::adapters::{AdapterError, ImageFetcher, ImageHost, MediaPlatform};
use crate::domain::{MediaAsset, Post};
use crate::imaging::ComposeError;

/// How posts with two or more images are published
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Merge the images into one and publish a single image
    Direct,
    /// Publish every image as a child of one carousel post
    #[default]
    Carousel,
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Carousel => write!(f, "carousel"),
        }
    }
}

/// A step of the publish sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    Download,
    Host,
    Container,
    CarouselContainer,
    Publish,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Download => "download",
            Self::Host => "image hosting",
            Self::Container => "container creation",
            Self::CarouselContainer => "carousel container creation",
            Self::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// What a failing step was working on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Image at this position in the post
    Image(usize),
    Composite,
    Post,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(i) => write!(f, "image {}", i),
            Self::Composite => write!(f, "composite image"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// Why a post could not be published
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{step} failed for {target}: {source}")]
    Adapter {
        step: PublishStep,
        target: Target,
        #[source]
        source: AdapterError,
    },

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl PublishError {
    fn at(step: PublishStep, target: Target) -> impl FnOnce(AdapterError) -> Self {
        move |source| Self::Adapter {
            step,
            target,
            source,
        }
    }

    /// The step that failed, if it was a network step
    pub fn step(&self) -> Option<PublishStep> {
        match self {
            Self::Adapter { step, .. } => Some(*step),
            Self::Compose(_) => None,
        }
    }
}

/// Uploads images and drives the container → publish sequence
#[derive(Clone)]
pub struct MediaPublisher {
    platform: Arc<dyn MediaPlatform>,
    host: Arc<dyn ImageHost>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl MediaPublisher {
    pub fn new(
        platform: Arc<dyn MediaPlatform>,
        host: Arc<dyn ImageHost>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            platform,
            host,
            fetcher,
        }
    }

    /// Download every image of a post, in order. Fails on the first bad image.
    pub async fn download_images(&self, post: &Post) -> Result<Vec<Vec<u8>>, PublishError> {
        let mut images = Vec::with_capacity(post.images.len());
        for (index, url) in post.image_urls().enumerate() {
            let bytes = self
                .fetcher
                .download(url)
                .await
                .map_err(PublishError::at(PublishStep::Download, Target::Image(index)))?;
            debug!(post_id = %post.id, image = index, size = bytes.len(), "Downloaded image");
            images.push(bytes);
        }
        Ok(images)
    }

    /// Publish one already-public image URL with the post text as caption
    pub async fn publish_url(&self, post: &Post, image_url: &str) -> Result<String, PublishError> {
        self.publish_single(post, MediaAsset::from_url(image_url), Target::Image(0))
            .await
    }

    /// Host an in-memory image, then publish it with the post text as caption
    pub async fn publish_bytes(&self, post: &Post, bytes: Vec<u8>) -> Result<String, PublishError> {
        let asset = self.host_asset(MediaAsset::from_bytes(bytes), Target::Composite).await?;
        self.publish_single(post, asset, Target::Composite).await
    }

    /// Re-host every image, create one child container per image, then
    /// publish a carousel referencing the children in order
    pub async fn publish_carousel(&self, post: &Post) -> Result<String, PublishError> {
        let mut children = Vec::with_capacity(post.images.len());

        for (index, url) in post.image_urls().enumerate() {
            let target = Target::Image(index);
            let bytes = self
                .fetcher
                .download(url)
                .await
                .map_err(PublishError::at(PublishStep::Download, target))?;

            let asset = self.host_asset(MediaAsset::from_bytes(bytes), target).await?;
            let hosted = asset.url.as_deref().unwrap_or_default();

            let container_id = self
                .platform
                .create_media_container(hosted, None, true)
                .await
                .map_err(PublishError::at(PublishStep::Container, target))?;
            debug!(post_id = %post.id, image = index, %container_id, "Created child container");

            let asset = asset.with_container(container_id);
            children.extend(asset.container_id);
        }

        let parent = self
            .platform
            .create_carousel_container(&children, &post.text)
            .await
            .map_err(PublishError::at(PublishStep::CarouselContainer, Target::Post))?;

        let media_id = self
            .platform
            .publish(&parent)
            .await
            .map_err(PublishError::at(PublishStep::Publish, Target::Post))?;

        info!(post_id = %post.id, children = children.len(), %media_id, "Published carousel");
        Ok(media_id)
    }

    async fn host_asset(&self, asset: MediaAsset, target: Target) -> Result<MediaAsset, PublishError> {
        let bytes = asset.bytes.as_deref().unwrap_or_default();
        let url = self
            .host
            .upload(bytes)
            .await
            .map_err(PublishError::at(PublishStep::Host, target))?;
        debug!(%target, %url, size = asset.size_bytes(), "Hosted image");
        Ok(asset.with_url(url))
    }

    async fn publish_single(
        &self,
        post: &Post,
        asset: MediaAsset,
        target: Target,
    ) -> Result<String, PublishError> {
        let url = asset.url.as_deref().unwrap_or_default();

        let container_id = self
            .platform
            .create_media_container(url, Some(&post.text), false)
            .await
            .map_err(PublishError::at(PublishStep::Container, target))?;

        let media_id = self
            .platform
            .publish(&container_id)
            .await
            .map_err(PublishError::at(PublishStep::Publish, Target::Post))?;

        info!(post_id = %post.id, %media_id, "Published image");
        Ok(media_id)
    }
}
