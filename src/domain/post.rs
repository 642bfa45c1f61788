//! Posts fetched from the source feed.
//!
//! A Post is built once per run by the feed fetcher and never mutated.

use serde::{Deserialize, Serialize};

/// A single image attached to a source post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Full-size image URL on the source CDN
    pub fullsize_url: String,

    /// Alt text (may be empty)
    #[serde(default)]
    pub alt: String,
}

impl ImageRef {
    pub fn new(fullsize_url: impl Into<String>) -> Self {
        Self {
            fullsize_url: fullsize_url.into(),
            alt: String::new(),
        }
    }
}

/// A post from the source feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Content identifier, unique per source post (used for dedup)
    pub id: String,

    /// AT-URI of the post (for logs only)
    #[serde(default)]
    pub uri: String,

    /// Post text, reused as the caption
    pub text: String,

    /// Attached images in display order
    pub images: Vec<ImageRef>,
}

impl Post {
    /// Create a post with no images
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: String::new(),
            text: text.into(),
            images: Vec::new(),
        }
    }

    /// Attach an image
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.images.push(ImageRef::new(url));
        self
    }

    /// Set the AT-URI
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Full-size URLs in display order
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.images.iter().map(|i| i.fullsize_url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_builder() {
        let post = Post::new("cid1", "hello")
            .with_uri("at://did:plc:x/app.bsky.feed.post/1")
            .with_image("https://cdn/a.jpg")
            .with_image("https://cdn/b.jpg");

        assert_eq!(post.image_count(), 2);
        assert_eq!(
            post.image_urls().collect::<Vec<_>>(),
            vec!["https://cdn/a.jpg", "https://cdn/b.jpg"]
        );
        assert!(post.uri.starts_with("at://"));
    }
}
