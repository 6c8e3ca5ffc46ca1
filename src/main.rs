use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use verse_backdrop::{
    BackgroundVideoManager, CollectionMode, Config, Selector, StopReason, VerseSpan,
};

#[derive(Parser)]
#[command(name = "verse-backdrop")]
#[command(version, author = "TigreRoll")]
#[command(about = "Themed background video selection for verse recitations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to verse-backdrop.toml lookup)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct SpanArgs {
    /// Unit (chapter) number
    #[arg(long)]
    unit: u32,

    /// First verse, inclusive
    #[arg(long)]
    from: u32,

    /// Last verse, inclusive
    #[arg(long)]
    to: u32,
}

impl SpanArgs {
    fn span(&self) -> VerseSpan {
        VerseSpan::new(self.unit, self.from, self.to)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the themes available for a verse span
    Themes {
        #[command(flatten)]
        span: SpanArgs,
    },
    /// Show the per-range segments of a verse span with their time windows
    Segments {
        #[command(flatten)]
        span: SpanArgs,
    },
    /// Collect background clips covering a duration
    Collect {
        #[command(flatten)]
        span: SpanArgs,

        /// Recitation length in seconds
        #[arg(long)]
        duration: f64,

        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,

        /// Draw themes from the verse range playing at each point
        #[arg(long)]
        per_range: bool,

        /// Footage library directory
        #[arg(long)]
        library: Option<PathBuf>,

        /// Retain selection history in this file
        #[arg(long)]
        state_file: Option<PathBuf>,

        /// Stitch the clips and print the prepared background
        #[arg(long)]
        stitch: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "verse_backdrop=debug,backdrop_core=debug"
    } else {
        "verse_backdrop=info,backdrop_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Themes { span } => {
            let selector = Selector::from_path(
                &config.selection.theme_metadata_path,
                config.selection.seed,
            )
            .await?;
            let themes = selector.themes_for_verses(span.span());

            if themes.is_empty() {
                info!("📭 No themes for {}", span.span().scope_key());
                return Ok(());
            }

            info!("🎨 {} themes for {}:", themes.len(), span.span().scope_key());
            for theme in themes {
                info!("  {}", theme);
            }
        }

        Commands::Segments { span } => {
            let selector = Selector::from_path(
                &config.selection.theme_metadata_path,
                config.selection.seed,
            )
            .await?;
            let segments = selector.verse_range_segments(span.span());

            if segments.is_empty() {
                info!("📭 No verse ranges for {}", span.span().scope_key());
                return Ok(());
            }

            for segment in segments {
                info!(
                    "  {}-{} [{:.3}, {:.3}) {} - {}",
                    segment.start_verse,
                    segment.end_verse,
                    segment.start_time_fraction,
                    segment.end_time_fraction,
                    segment.range_key,
                    segment.themes.join(", ")
                );
            }
        }

        Commands::Collect {
            span,
            duration,
            seed,
            per_range,
            library,
            state_file,
            stitch,
        } => {
            if !(duration > 0.0) {
                bail!("Duration must be greater than 0");
            }

            if let Some(seed) = seed {
                config.selection.seed = seed;
            }
            if per_range {
                config.selection.mode = CollectionMode::PerRange;
            }
            if let Some(library) = library {
                config.library.root_dir = library;
            }
            if let Some(state_file) = state_file {
                config.selection.state_file = Some(state_file);
            }
            if stitch {
                // The printed path lives in the work directory
                config.output.keep_temp_files = true;
            }

            info!("🚀 Verse Backdrop starting...");
            info!("{}", config.summary());

            let mut manager = BackgroundVideoManager::new(config)?;

            if stitch {
                let background = manager.prepare_background_video(span.span(), duration).await;
                info!("🎬 Background: {}", background.display());
            } else {
                let result = manager
                    .collect_video_segments(span.span(), duration)
                    .await?;

                for (index, segment) in result.segments.iter().enumerate() {
                    info!(
                        "  {:>3}. [{}] {} ({:.2}s)",
                        index + 1,
                        segment.theme,
                        segment.video_id,
                        segment.duration
                    );
                }
                info!(
                    "📊 Total: {:.2}s of {:.2}s in {} iterations",
                    result.total_duration, result.target_duration, result.iterations
                );
                if result.stop_reason == StopReason::IterationLimit {
                    warn!("⚠️ Iteration limit reached before the target duration");
                }
            }

            manager.cleanup()?;
        }
    }

    Ok(())
}
