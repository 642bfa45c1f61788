//! Media assets moving between platform boundaries.

/// An image payload and the handles it picks up on the way to publication.
///
/// Lives only for the processing of a single post.
#[derive(Debug, Clone, Default)]
pub struct MediaAsset {
    /// Raw image bytes (absent when the source URL is published as-is)
    pub bytes: Option<Vec<u8>>,

    /// Publicly fetchable URL (source CDN or image host)
    pub url: Option<String>,

    /// Destination container id once created
    pub container_id: Option<String>,
}

impl MediaAsset {
    /// Asset backed by a URL the destination can fetch directly
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Asset backed by an in-memory payload that still needs hosting
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.as_ref().map(Vec::len).unwrap_or(0)
    }
}
