//! In-memory stand-ins for every external boundary.
//!
//! Each fake records the calls it receives so tests can assert on what the
//! orchestrator did, not just on the final report.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crosspost::adapters::{AdapterError, FeedSource, ImageFetcher, ImageHost, MediaPlatform};
use crosspost::core::{MediaPublisher, Orchestrator, PostLog, ProcessedPosts, PublishMode, RunSettings};
use crosspost::domain::Post;
use crosspost::imaging::{
    ComposeError, CompositeLayout, Compositor, LayoutMode, OutputFormat, RasterCompositor,
};

/// Encode a solid-colour PNG
pub fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Post with `n` images at `https://cdn.test/{id}/{i}.jpg`
pub fn post(id: &str, n: usize) -> Post {
    (0..n).fold(Post::new(id, format!("caption {}", id)), |p, i| {
        p.with_image(format!("https://cdn.test/{}/{}.jpg", id, i))
    })
}

fn rejected(service: &'static str, message: &str) -> AdapterError {
    AdapterError::Rejected {
        service,
        status: 400,
        message: message.to_string(),
    }
}

#[derive(Default)]
pub struct FakeFeed {
    pub posts: Mutex<Vec<Post>>,
    pub fail: bool,
    pub calls: Mutex<Vec<(String, u32)>>,
}

impl FakeFeed {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: Mutex::new(posts),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch_recent_posts(&self, actor: &str, limit: u32) -> Result<Vec<Post>, AdapterError> {
        self.calls.lock().unwrap().push((actor.to_string(), limit));
        if self.fail {
            return Err(rejected("bluesky", "AuthMissing"));
        }
        Ok(self.posts.lock().unwrap().clone())
    }
}

/// Serves a small PNG for every URL except the ones marked as broken
#[derive(Default)]
pub struct FakeFetcher {
    pub broken: HashSet<String>,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn breaking(url: impl Into<String>) -> Self {
        Self {
            broken: std::iter::once(url.into()).collect(),
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn download(&self, url: &str) -> Result<Vec<u8>, AdapterError> {
        self.downloads.lock().unwrap().push(url.to_string());
        if self.broken.contains(url) {
            return Err(AdapterError::NotAnImage {
                url: url.to_string(),
                content_type: "text/html".to_string(),
            });
        }
        Ok(png(16, 8, [200, 10, 10]))
    }
}

#[derive(Default)]
pub struct FakeHost {
    pub uploads: AtomicUsize,
}

impl FakeHost {
    pub fn count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageHost for FakeHost {
    async fn upload(&self, bytes: &[u8]) -> Result<String, AdapterError> {
        assert!(!bytes.is_empty(), "uploaded an empty payload");
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://host.test/{}.jpg", n))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Container {
        image_url: String,
        caption: Option<String>,
        child: bool,
    },
    Carousel {
        children: Vec<String>,
        caption: String,
    },
    Publish {
        container_id: String,
    },
}

#[derive(Default)]
pub struct FakePlatform {
    pub calls: Mutex<Vec<PlatformCall>>,
    /// Captions whose publish call is rejected
    pub reject_publish: Mutex<HashSet<String>>,
    /// Reject every child container creation
    pub reject_children: bool,
    pub counter: AtomicUsize,
    pub captions: Mutex<std::collections::HashMap<String, String>>,
}

impl FakePlatform {
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn published_captions(&self) -> Vec<String> {
        let captions = self.captions.lock().unwrap();
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::Publish { container_id } => captions.get(&container_id).cloned(),
                _ => None,
            })
            .collect()
    }

    pub fn child_containers(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PlatformCall::Container { child: true, .. }))
            .count()
    }

    pub fn publish_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PlatformCall::Publish { .. }))
            .count()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl MediaPlatform for FakePlatform {
    async fn create_media_container(
        &self,
        image_url: &str,
        caption: Option<&str>,
        is_carousel_child: bool,
    ) -> Result<String, AdapterError> {
        self.calls.lock().unwrap().push(PlatformCall::Container {
            image_url: image_url.to_string(),
            caption: caption.map(str::to_string),
            child: is_carousel_child,
        });
        if is_carousel_child && self.reject_children {
            return Err(rejected("instagram", "Only photo or video can be accepted"));
        }
        let id = self.next_id("container");
        if let Some(c) = caption {
            self.captions.lock().unwrap().insert(id.clone(), c.to_string());
        }
        Ok(id)
    }

    async fn create_carousel_container(
        &self,
        children: &[String],
        caption: &str,
    ) -> Result<String, AdapterError> {
        self.calls.lock().unwrap().push(PlatformCall::Carousel {
            children: children.to_vec(),
            caption: caption.to_string(),
        });
        let id = self.next_id("carousel");
        self.captions.lock().unwrap().insert(id.clone(), caption.to_string());
        Ok(id)
    }

    async fn publish(&self, container_id: &str) -> Result<String, AdapterError> {
        self.calls.lock().unwrap().push(PlatformCall::Publish {
            container_id: container_id.to_string(),
        });
        let caption = self
            .captions
            .lock()
            .unwrap()
            .get(container_id)
            .cloned()
            .unwrap_or_default();
        if self.reject_publish.lock().unwrap().contains(&caption) {
            return Err(rejected("instagram", "The media is not ready for publishing"));
        }
        Ok(self.next_id("media"))
    }
}

/// Real compositor that counts invocations
#[derive(Default)]
pub struct CountingCompositor {
    pub calls: AtomicUsize,
}

impl CountingCompositor {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Compositor for CountingCompositor {
    fn compose(
        &self,
        images: &[Vec<u8>],
        layout: &CompositeLayout,
    ) -> Result<Vec<u8>, ComposeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        RasterCompositor::new().compose(images, layout)
    }
}

/// Post log kept in memory, counting writes
#[derive(Default)]
pub struct MemoryLog {
    pub ids: Mutex<Vec<String>>,
    pub persists: AtomicUsize,
    /// Number of persisted ids observed at each write
    pub snapshots: Mutex<Vec<usize>>,
}

impl MemoryLog {
    pub fn seeded(ids: &[&str]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostLog for MemoryLog {
    async fn load(&self) -> Result<ProcessedPosts> {
        Ok(self.ids().into_iter().collect())
    }

    async fn persist(&self, posts: &ProcessedPosts) -> Result<()> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        self.snapshots.lock().unwrap().push(posts.len());
        *self.ids.lock().unwrap() = posts.ids().to_vec();
        Ok(())
    }
}

/// All fakes wired into one orchestrator
pub struct Harness {
    pub feed: Arc<FakeFeed>,
    pub fetcher: Arc<FakeFetcher>,
    pub host: Arc<FakeHost>,
    pub platform: Arc<FakePlatform>,
    pub compositor: Arc<CountingCompositor>,
    pub log: Arc<dyn PostLog>,
    pub settings: RunSettings,
}

impl Harness {
    pub fn new(feed: FakeFeed, log: Arc<dyn PostLog>, mode: PublishMode) -> Self {
        Self {
            feed: Arc::new(feed),
            fetcher: Arc::new(FakeFetcher::default()),
            host: Arc::new(FakeHost::default()),
            platform: Arc::new(FakePlatform::default()),
            compositor: Arc::new(CountingCompositor::default()),
            log,
            settings: RunSettings {
                actor: "poptime.space".to_string(),
                limit: 10,
                publish_mode: mode,
                layout: LayoutMode::StackedSquare {
                    size: 64,
                    background: Default::default(),
                },
                format: OutputFormat::Jpeg,
                dry_run: false,
            },
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        let publisher = MediaPublisher::new(
            self.platform.clone(),
            self.host.clone(),
            self.fetcher.clone(),
        );
        Orchestrator::new(
            self.feed.clone(),
            publisher,
            self.compositor.clone(),
            self.log.clone(),
            self.settings.clone(),
        )
    }
}
