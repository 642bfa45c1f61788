//! Configuration for crosspost.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags (actor, limit, state file, publish mode)
//! 2. Environment variables, after loading `.env` (secrets only)
//! 3. Config file (.crosspost/config.yaml)
//! 4. Defaults (~/.crosspost)
//!
//! Config file discovery:
//! - Searches current directory and parents for .crosspost/config.yaml
//! - Relative paths in the config file are resolved against the directory
//!   that contains `.crosspost/`
//!
//! The resolved [`Config`] is built once in `main` and handed to every
//! component at construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::bluesky::DEFAULT_FEED_ENDPOINT;
use crate::adapters::imgbb::DEFAULT_UPLOAD_ENDPOINT;
use crate::adapters::instagram::DEFAULT_GRAPH_BASE;
use crate::core::PublishMode;
use crate::imaging::{LayoutMode, OutputFormat};

pub const ENV_BLUESKY_API_KEY: &str = "BLUESKY_API_KEY";
pub const ENV_INSTAGRAM_ACCESS_TOKEN: &str = "INSTAGRAM_ACCESS_TOKEN";
pub const ENV_INSTAGRAM_ACCOUNT_ID: &str = "USER_ID_IG";
pub const ENV_IMGBB_API_KEY: &str = "IMGBB_API_KEY";

const DEFAULT_ACTOR: &str = "poptime.space";
const DEFAULT_LIMIT: u32 = 1;
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
const STATE_FILE_NAME: &str = "posted_posts.json";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Source account handle
    pub actor: Option<String>,
    /// Posts requested per run
    pub limit: Option<u32>,
    /// Processed-post log (relative to the project root)
    pub state_file: Option<String>,
    #[serde(default)]
    pub publish_mode: Option<PublishMode>,
    #[serde(default)]
    pub layout: Option<LayoutMode>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    pub http_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointsConfig {
    pub feed: Option<String>,
    pub graph: Option<String>,
    pub imgbb: Option<String>,
}

/// Resolved service endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Full getAuthorFeed URL
    pub feed: String,
    /// Graph API base including version
    pub graph: String,
    /// Image host upload URL
    pub imgbb: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            feed: DEFAULT_FEED_ENDPOINT.to_string(),
            graph: DEFAULT_GRAPH_BASE.to_string(),
            imgbb: DEFAULT_UPLOAD_ENDPOINT.to_string(),
        }
    }
}

/// API secrets, read from the environment only
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Optional: the public feed endpoint accepts anonymous reads
    pub bluesky_api_key: Option<String>,
    pub instagram_access_token: Option<String>,
    pub instagram_account_id: Option<String>,
    pub imgbb_api_key: Option<String>,
}

impl Credentials {
    /// Read credentials through `lookup` (normally `std::env::var`)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            bluesky_api_key: get(ENV_BLUESKY_API_KEY),
            instagram_access_token: get(ENV_INSTAGRAM_ACCESS_TOKEN),
            instagram_account_id: get(ENV_INSTAGRAM_ACCOUNT_ID),
            imgbb_api_key: get(ENV_IMGBB_API_KEY),
        }
    }

    /// Names of required variables that are not set
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.instagram_access_token.is_none() {
            missing.push(ENV_INSTAGRAM_ACCESS_TOKEN);
        }
        if self.instagram_account_id.is_none() {
            missing.push(ENV_INSTAGRAM_ACCOUNT_ID);
        }
        if self.imgbb_api_key.is_none() {
            missing.push(ENV_IMGBB_API_KEY);
        }
        missing
    }

    /// Fail unless everything needed to publish is present
    pub fn require_publishing(&self) -> Result<()> {
        let missing = self.missing();
        if !missing.is_empty() {
            anyhow::bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.as_deref().map(redact).unwrap_or_else(|| "<unset>".into());
        f.debug_struct("Credentials")
            .field("bluesky_api_key", &show(&self.bluesky_api_key))
            .field("instagram_access_token", &show(&self.instagram_access_token))
            .field("instagram_account_id", &self.instagram_account_id)
            .field("imgbb_api_key", &show(&self.imgbb_api_key))
            .finish()
    }
}

/// Hide all but the last four characters of a secret
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct Config {
    /// Source account handle
    pub actor: String,
    /// Posts requested per run
    pub limit: u32,
    /// Absolute path to the processed-post log
    pub state_file: PathBuf,
    /// How posts with several images are published
    pub publish_mode: PublishMode,
    /// Composite layout for the direct mode
    pub layout: LayoutMode,
    /// Composite encoding
    pub format: OutputFormat,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    pub endpoints: Endpoints,
    pub credentials: Credentials,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub actor: Option<String>,
    pub limit: Option<u32>,
    pub state_file: Option<PathBuf>,
    pub publish_mode: Option<PublishMode>,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(overrides: Overrides) -> Result<Self> {
        // A missing .env is normal in production
        let _ = dotenvy::dotenv();

        let default_home = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".crosspost");

        let config_file = find_config_file();
        let file = match &config_file {
            Some(path) => Some(load_config_file(path)?),
            None => None,
        };

        let mut config = Self::resolve(
            file.as_ref(),
            config_file.as_deref(),
            &default_home,
            Credentials::from_lookup(|name| std::env::var(name).ok()),
        );
        config.config_file = config_file;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would fail every run
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            anyhow::bail!("limit must be at least 1");
        }
        self.layout
            .validate(self.format)
            .with_context(|| format!("Invalid layout {:?} for {:?} output", self.layout, self.format))
    }

    /// Merge a parsed config file (if any) over the defaults
    pub fn resolve(
        file: Option<&ConfigFile>,
        config_path: Option<&Path>,
        default_home: &Path,
        credentials: Credentials,
    ) -> Self {
        let default_file = ConfigFile::default();
        let file = file.unwrap_or(&default_file);

        // Base directory is the parent of .crosspost/ (i.e., grandparent of config.yaml)
        let base_dir = config_path
            .and_then(|p| p.parent())
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));

        let state_file = file
            .state_file
            .as_deref()
            .map(|s| resolve_path(base_dir, s))
            .unwrap_or_else(|| default_home.join(STATE_FILE_NAME));

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            feed: file.endpoints.feed.clone().unwrap_or(defaults.feed),
            graph: file.endpoints.graph.clone().unwrap_or(defaults.graph),
            imgbb: file.endpoints.imgbb.clone().unwrap_or(defaults.imgbb),
        };

        Self {
            actor: file.actor.clone().unwrap_or_else(|| DEFAULT_ACTOR.to_string()),
            limit: file.limit.unwrap_or(DEFAULT_LIMIT),
            state_file,
            publish_mode: file.publish_mode.unwrap_or_default(),
            layout: file.layout.unwrap_or_default(),
            format: file.format.unwrap_or_default(),
            http_timeout: Duration::from_secs(
                file.http_timeout_seconds
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS),
            ),
            endpoints,
            credentials,
            config_file: config_path.map(Path::to_path_buf),
        }
    }

    /// Apply command-line overrides
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(actor) = overrides.actor {
            self.actor = actor;
        }
        if let Some(limit) = overrides.limit {
            self.limit = limit;
        }
        if let Some(state_file) = overrides.state_file {
            self.state_file = state_file;
        }
        if let Some(mode) = overrides.publish_mode {
            self.publish_mode = mode;
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".crosspost").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Color;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_credentials() -> Credentials {
        Credentials::default()
    }

    #[test]
    fn test_defaults_without_file() {
        let home = PathBuf::from("/home/u/.crosspost");
        let config = Config::resolve(None, None, &home, no_credentials());

        assert_eq!(config.actor, "poptime.space");
        assert_eq!(config.limit, 1);
        assert_eq!(config.state_file, home.join("posted_posts.json"));
        assert_eq!(config.publish_mode, PublishMode::Carousel);
        assert_eq!(config.format, OutputFormat::Jpeg);
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".crosspost");
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r##"
actor: someone.bsky.social
limit: 5
state_file: state/posted.json
publish_mode: direct
layout:
  mode: side_by_side
  width: 600
  height: 400
format: png
http_timeout_seconds: 10
endpoints:
  graph: http://localhost:9000/v20.0
"##
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        let config = Config::resolve(
            Some(&parsed),
            Some(&config_path),
            Path::new("/unused"),
            no_credentials(),
        );

        assert_eq!(config.actor, "someone.bsky.social");
        assert_eq!(config.limit, 5);
        assert_eq!(config.state_file, temp.path().join("state/posted.json"));
        assert_eq!(config.publish_mode, PublishMode::Direct);
        assert_eq!(
            config.layout,
            LayoutMode::SideBySide {
                width: 600,
                height: 400
            }
        );
        assert_eq!(config.format, OutputFormat::Png);
        assert_eq!(config.endpoints.graph, "http://localhost:9000/v20.0");
        assert_eq!(config.endpoints.feed, DEFAULT_FEED_ENDPOINT);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_stacked_background_defaults_to_white() {
        let parsed: ConfigFile =
            serde_yaml::from_str("layout:\n  mode: stacked_square\n  size: 640\n").unwrap();
        assert_eq!(
            parsed.layout,
            Some(LayoutMode::StackedSquare {
                size: 640,
                background: Color::WHITE
            })
        );
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::resolve(None, None, Path::new("/h"), no_credentials());
        config.apply(Overrides {
            actor: Some("other.bsky.social".to_string()),
            limit: Some(3),
            state_file: Some(PathBuf::from("/tmp/state.json")),
            publish_mode: Some(PublishMode::Direct),
        });

        assert_eq!(config.actor, "other.bsky.social");
        assert_eq!(config.limit, 3);
        assert_eq!(config.state_file, PathBuf::from("/tmp/state.json"));
        assert_eq!(config.publish_mode, PublishMode::Direct);
    }

    #[test]
    fn test_layout_validated_on_load() {
        let mut config = Config::resolve(None, None, Path::new("/h"), no_credentials());
        assert!(config.validate().is_ok());

        config.layout = LayoutMode::StackedSquare {
            size: 0,
            background: Color::WHITE,
        };
        assert!(config.validate().is_err());

        config.layout = LayoutMode::SideBySide {
            width: 20_000,
            height: 400,
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("too large"));

        config.layout = LayoutMode::default();
        config.limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("INSTAGRAM_ACCESS_TOKEN", "EAAB-token"),
            ("USER_ID_IG", "1784"),
            ("IMGBB_API_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let creds = Credentials::from_lookup(|name| env.get(name).map(|v| v.to_string()));
        assert!(creds.bluesky_api_key.is_none());
        assert_eq!(creds.instagram_account_id.as_deref(), Some("1784"));
        // Blank values count as unset
        assert_eq!(creds.missing(), vec!["IMGBB_API_KEY"]);
        assert!(creds.require_publishing().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials {
            instagram_access_token: Some("EAABsecretvalue1234".to_string()),
            ..Default::default()
        };
        let shown = format!("{:?}", creds);
        assert!(shown.contains("****1234"));
        assert!(!shown.contains("EAABsecret"));
        assert_eq!(redact("abc"), "****");
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/./subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
