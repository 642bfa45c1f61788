//! Command-line interface for crosspost.
//!
//! Provides commands for running one batch, inspecting the post log,
//! showing the resolved configuration, and composing local images.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{self, Config, Overrides};
use crate::core::{JsonFileLog, Orchestrator, PostLog, PublishMode};
use crate::domain::RunReport;
use crate::imaging::{self, Color, LayoutMode, OutputFormat, RasterCompositor};

/// crosspost - republish Bluesky images to Instagram
#[derive(Parser, Debug)]
#[command(name = "crosspost")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Processed-post log (overrides the config file)
    #[arg(long, global = true, env = "CROSSPOST_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the feed once and publish every new post
    Run(RunArgs),

    /// Show the processed-post log
    Status {
        /// Maximum number of ids to show (most recent last)
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,

    /// Compose local images into one file using a layout
    Compose(ComposeArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source account handle
    #[arg(short, long)]
    pub actor: Option<String>,

    /// Number of recent posts to fetch
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// How posts with several images are published
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Fetch and filter only, publish nothing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Input images, in placement order
    #[arg(required = true, num_args = 2..)]
    pub inputs: Vec<PathBuf>,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Layout (defaults to the configured one)
    #[arg(long, value_enum)]
    pub layout: Option<LayoutArg>,

    /// Tile width for side-by-side
    #[arg(long, default_value = "600")]
    pub width: u32,

    /// Tile height for side-by-side
    #[arg(long, default_value = "400")]
    pub height: u32,

    /// Square size for stacked-square
    #[arg(long, default_value = "1080")]
    pub size: u32,

    /// Padding colour for stacked-square (#rrggbb)
    #[arg(long, default_value = "#ffffff")]
    pub background: Color,

    /// Output encoding (defaults to the configured one)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
}

/// Publish mode for CLI (maps to PublishMode)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Merge images into one picture
    Direct,

    /// One carousel child per image
    Carousel,
}

impl From<ModeArg> for PublishMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Direct => PublishMode::Direct,
            ModeArg::Carousel => PublishMode::Carousel,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LayoutArg {
    SideBySide,
    StackedSquare,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
        }
    }
}

impl ComposeArgs {
    fn layout_mode(&self, configured: LayoutMode) -> LayoutMode {
        match self.layout {
            None => configured,
            Some(LayoutArg::SideBySide) => LayoutMode::SideBySide {
                width: self.width,
                height: self.height,
            },
            Some(LayoutArg::StackedSquare) => LayoutMode::StackedSquare {
                size: self.size,
                background: self.background,
            },
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut overrides = Overrides {
            state_file: self.state_file,
            ..Default::default()
        };

        match self.command {
            Commands::Run(args) => {
                overrides.actor = args.actor;
                overrides.limit = args.limit;
                overrides.publish_mode = args.mode.map(Into::into);
                let cfg = Config::load(overrides)?;
                run_once(&cfg, args.dry_run).await
            }
            Commands::Status { limit } => {
                let cfg = Config::load(overrides)?;
                show_status(&cfg, limit).await
            }
            Commands::Config => {
                let cfg = Config::load(overrides)?;
                show_config(&cfg);
                Ok(())
            }
            Commands::Compose(args) => {
                let cfg = Config::load(overrides)?;
                compose(&cfg, args).await
            }
        }
    }
}

/// Run one batch and print a summary
async fn run_once(cfg: &Config, dry_run: bool) -> Result<()> {
    let orchestrator = Orchestrator::from_config(cfg, dry_run)?;
    let report = orchestrator.run_once().await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Run {}{}", report.id, if report.dry_run { " (dry run)" } else { "" });
    println!("  Fetched:           {}", report.fetched);
    println!("  Already published: {}", report.already_published.len());
    if !report.repeated.is_empty() {
        println!("  Repeated in feed:  {}", report.repeated.len());
    }
    println!("  Without images:    {}", report.skipped_no_images.len());
    println!("  Published:         {}", report.published.len());
    for id in &report.published {
        println!("    + {}", id);
    }
    println!("  Failed:            {}", report.failed.len());
    for failure in &report.failed {
        println!("    ! {}: {}", failure.post_id, failure.error);
    }
    if report.candidates() == 0 {
        println!("Nothing to publish.");
    }
}

/// Show the processed-post log
async fn show_status(cfg: &Config, limit: usize) -> Result<()> {
    if !cfg.state_file.exists() {
        println!("No post log at {} (nothing published yet)", cfg.state_file.display());
        return Ok(());
    }

    let log = JsonFileLog::new(&cfg.state_file);
    let posts = log.load().await?;

    println!("Post log: {}", cfg.state_file.display());
    println!("Published posts: {}", posts.len());

    let ids = posts.ids();
    let start = ids.len().saturating_sub(limit);
    for id in &ids[start..] {
        println!("  {}", id);
    }

    Ok(())
}

fn show_config(cfg: &Config) {
    let secret = |v: &Option<String>| {
        v.as_deref()
            .map(config::redact)
            .unwrap_or_else(|| "(unset)".to_string())
    };

    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Source:");
    println!("  Actor:          {}", cfg.actor);
    println!("  Limit:          {}", cfg.limit);
    println!("  Feed endpoint:  {}", cfg.endpoints.feed);
    println!();
    println!("Destination:");
    println!("  Graph API:      {}", cfg.endpoints.graph);
    println!("  Image host:     {}", cfg.endpoints.imgbb);
    println!("  Publish mode:   {}", cfg.publish_mode);
    println!("  Layout:         {:?}", cfg.layout);
    println!("  Format:         {:?}", cfg.format);
    println!();
    println!("State file:       {}", cfg.state_file.display());
    println!("HTTP timeout:     {}s", cfg.http_timeout.as_secs());
    println!();
    println!("Credentials:");
    println!("  {}: {}", config::ENV_BLUESKY_API_KEY, secret(&cfg.credentials.bluesky_api_key));
    println!(
        "  {}: {}",
        config::ENV_INSTAGRAM_ACCESS_TOKEN,
        secret(&cfg.credentials.instagram_access_token)
    );
    println!(
        "  {}: {}",
        config::ENV_INSTAGRAM_ACCOUNT_ID,
        cfg.credentials
            .instagram_account_id
            .as_deref()
            .unwrap_or("(unset)")
    );
    println!("  {}: {}", config::ENV_IMGBB_API_KEY, secret(&cfg.credentials.imgbb_api_key));
}

/// Compose local files into one image
async fn compose(cfg: &Config, args: ComposeArgs) -> Result<()> {
    let mode = args.layout_mode(cfg.layout);
    let format = args.format.map(Into::into).unwrap_or(cfg.format);

    let layout = imaging::compose_files(
        &RasterCompositor::new(),
        &args.inputs,
        &mode,
        format,
        &args.output,
    )
    .await
    .with_context(|| format!("Failed to compose {} images", args.inputs.len()))?;

    println!(
        "Wrote {} ({}x{}, {} images)",
        args.output.display(),
        layout.canvas_width,
        layout.canvas_height,
        layout.tiles.len()
    );
    Ok(())
}
