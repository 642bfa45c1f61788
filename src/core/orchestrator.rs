//! Main orchestrator for one batch run.
//!
//! Fetches the feed, drops already-published posts, publishes the rest one at
//! a time and records each success in the post log as soon as it happens.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{
    BlueskyClient, FeedSource, HttpImageFetcher, ImgbbClient, InstagramClient,
};
use crate::config::Config;
use crate::domain::{Post, RunReport};
use crate::imaging::{CompositeLayout, Compositor, LayoutMode, OutputFormat, RasterCompositor};

use super::post_log::{JsonFileLog, PostLog, ProcessedPosts};
use super::publisher::{MediaPublisher, PublishError, PublishMode};

/// Per-run settings taken from the resolved config
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub actor: String,
    pub limit: u32,
    pub publish_mode: PublishMode,
    pub layout: LayoutMode,
    pub format: OutputFormat,
    /// Fetch and filter only; never publish or record
    pub dry_run: bool,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            actor: config.actor.clone(),
            limit: config.limit,
            publish_mode: config.publish_mode,
            layout: config.layout,
            format: config.format,
            dry_run: false,
        }
    }
}

/// Batch run orchestrator
pub struct Orchestrator {
    feed: Arc<dyn FeedSource>,
    publisher: MediaPublisher,
    compositor: Arc<dyn Compositor>,
    log: Arc<dyn PostLog>,
    settings: RunSettings,
}

impl Orchestrator {
    /// Create an orchestrator from its collaborators
    pub fn new(
        feed: Arc<dyn FeedSource>,
        publisher: MediaPublisher,
        compositor: Arc<dyn Compositor>,
        log: Arc<dyn PostLog>,
        settings: RunSettings,
    ) -> Self {
        Self {
            feed,
            publisher,
            compositor,
            log,
            settings,
        }
    }

    /// Wire the production adapters from config.
    ///
    /// Publishing credentials are only required when `dry_run` is false.
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self> {
        if !dry_run {
            config
                .credentials
                .require_publishing()
                .context("Cannot publish without credentials (use --dry-run to preview)")?;
        }

        let creds = &config.credentials;
        let timeout = config.http_timeout;

        let feed = BlueskyClient::new(
            &config.endpoints.feed,
            creds.bluesky_api_key.clone(),
            timeout,
        )?;
        let platform = InstagramClient::new(
            &config.endpoints.graph,
            creds.instagram_account_id.clone().unwrap_or_default(),
            creds.instagram_access_token.clone().unwrap_or_default(),
            timeout,
        )?;
        let host = ImgbbClient::new(
            &config.endpoints.imgbb,
            creds.imgbb_api_key.clone().unwrap_or_default(),
            timeout,
        )?;
        let publisher = MediaPublisher::new(
            Arc::new(platform),
            Arc::new(host),
            Arc::new(HttpImageFetcher::new(timeout)?),
        );

        let mut settings = RunSettings::from_config(config);
        settings.dry_run = dry_run;

        Ok(Self::new(
            Arc::new(feed),
            publisher,
            Arc::new(RasterCompositor::new()),
            Arc::new(JsonFileLog::new(&config.state_file)),
            settings,
        ))
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Execute one run.
    ///
    /// Only a failure to load the post log is returned as an error. Every
    /// other failure is contained to its post and listed in the report.
    #[instrument(skip(self), fields(actor = %self.settings.actor, mode = %self.settings.publish_mode))]
    pub async fn run_once(&self) -> Result<RunReport> {
        let mut report = RunReport::new(Uuid::new_v4());
        report.dry_run = self.settings.dry_run;
        info!(run_id = %report.id, "Starting run");

        // Loaded once; later checks use the in-memory copy.
        // A dry run must not bootstrap the file either.
        let loaded = if self.settings.dry_run {
            self.log.read().await
        } else {
            self.log.load().await
        };
        let mut processed = loaded.context("Failed to load post log")?;

        let posts = self.fetch_posts().await;
        report.fetched = posts.len();

        let FilteredPosts {
            fresh,
            known,
            repeated,
        } = filter_new_posts(posts, &processed);
        report.already_published = known;
        if !repeated.is_empty() {
            debug!(ids = ?repeated, "Dropped repeated feed items");
        }
        report.repeated = repeated;

        if fresh.is_empty() {
            info!(fetched = report.fetched, "Nothing to publish");
            report.finish();
            return Ok(report);
        }

        for post in fresh {
            if post.images.is_empty() {
                info!(post_id = %post.id, "Post has no images, skipping");
                report.skipped_no_images.push(post.id);
                continue;
            }

            if self.settings.dry_run {
                info!(
                    post_id = %post.id,
                    images = post.image_count(),
                    "Dry run: would publish"
                );
                continue;
            }

            match self.publish_post(&post).await {
                Ok(media_id) => {
                    processed.insert(post.id.clone());
                    match self.log.persist(&processed).await {
                        Ok(()) => {
                            info!(post_id = %post.id, %media_id, "Post published and recorded");
                            report.published.push(post.id);
                        }
                        Err(e) => {
                            error!(post_id = %post.id, %media_id, error = %e, "Post published but not recorded");
                            report.record_failure(
                                post.id,
                                format!("published as {} but not recorded: {:#}", media_id, e),
                            );
                        }
                    }
                }
                Err(e) => {
                    error!(post_id = %post.id, uri = %post.uri, error = %e, "Failed to publish post");
                    report.record_failure(post.id, e);
                }
            }
        }

        report.finish();
        info!(
            published = report.published.len(),
            failed = report.failed.len(),
            skipped = report.skipped_no_images.len(),
            "Run completed"
        );
        Ok(report)
    }

    /// Fetch the feed, degrading to no posts on failure
    async fn fetch_posts(&self) -> Vec<Post> {
        match self
            .feed
            .fetch_recent_posts(&self.settings.actor, self.settings.limit)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                warn!(actor = %self.settings.actor, error = %e, "Failed to fetch feed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Publish a post with at least one image
    async fn publish_post(&self, post: &Post) -> Result<String, PublishError> {
        if let [only] = post.images.as_slice() {
            return self.publisher.publish_url(post, &only.fullsize_url).await;
        }

        match self.settings.publish_mode {
            PublishMode::Carousel => self.publisher.publish_carousel(post).await,
            PublishMode::Direct => {
                let images = self.publisher.download_images(post).await?;
                let layout =
                    CompositeLayout::plan(&self.settings.layout, images.len(), self.settings.format)?;
                let combined = self.compositor.compose(&images, &layout)?;
                info!(
                    post_id = %post.id,
                    width = layout.canvas_width,
                    height = layout.canvas_height,
                    "Composed images"
                );
                self.publisher.publish_bytes(post, combined).await
            }
        }
    }
}

/// Fetched posts split by what the run should do with them
#[derive(Debug, Default)]
pub struct FilteredPosts {
    /// Not yet published, first occurrence only, in fetch order
    pub fresh: Vec<Post>,
    /// Ids already in the post log
    pub known: Vec<String>,
    /// Ids seen earlier in the same batch (reposts of the author's own post)
    pub repeated: Vec<String>,
}

/// Drop posts already in the log and repeats within the batch
pub fn filter_new_posts(posts: Vec<Post>, processed: &ProcessedPosts) -> FilteredPosts {
    let mut filtered = FilteredPosts::default();
    let mut seen = HashSet::new();

    for post in posts {
        if processed.contains(&post.id) {
            filtered.known.push(post.id);
        } else if !seen.insert(post.id.clone()) {
            filtered.repeated.push(post.id);
        } else {
            filtered.fresh.push(post);
        }
    }
    filtered
}
