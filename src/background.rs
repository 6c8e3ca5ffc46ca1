use crate::config::Config;
use crate::library::LocalLibrary;
use crate::video::{FfprobeDurationProbe, VideoStitcher};
use anyhow::{Context, Result};
use backdrop_core::{
    CollectionResult, Collector, DurationProbe, SelectionState, Selector, VerseSpan, VideoSegment,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Prepares the background clip for one verse span.
///
/// Owns a run-scoped temporary directory that receives downloaded clips and
/// the stitched result. The directory is removed by [`cleanup`] or on drop,
/// unless `keep_temp_files` is set.
///
/// [`cleanup`]: BackgroundVideoManager::cleanup
pub struct BackgroundVideoManager {
    config: Config,
    temp_dir: Option<TempDir>,
    work_dir: PathBuf,
    library: LocalLibrary,
    probe: Box<dyn DurationProbe>,
    stitcher: VideoStitcher,
}

impl BackgroundVideoManager {
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("verse_bg_");
        let temp_dir = match &config.output.work_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        let work_dir = temp_dir.path().to_path_buf();
        debug!("📂 Work directory: {}", work_dir.display());

        let library = LocalLibrary::new(
            config.library.root_dir.clone(),
            work_dir.clone(),
            config.library.supported_extensions.clone(),
        );

        Ok(Self {
            config,
            temp_dir: Some(temp_dir),
            work_dir,
            library,
            probe: Box::new(FfprobeDurationProbe::new()),
            stitcher: VideoStitcher::new(),
        })
    }

    /// Replace the ffprobe-backed duration probe
    pub fn with_probe(mut self, probe: Box<dyn DurationProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Collect clips for a span until `target_duration` seconds are covered.
    ///
    /// Fails when the metadata cannot be loaded or no theme covers the span.
    /// The configured state file, if any, is loaded before and saved after
    /// the run.
    pub async fn collect_video_segments(
        &self,
        span: VerseSpan,
        target_duration: f64,
    ) -> Result<CollectionResult> {
        let selection = &self.config.selection;
        let mut selector = Selector::from_path(&selection.theme_metadata_path, selection.seed)
            .await
            .context("Failed to load theme metadata")?;

        let mut state = match &selection.state_file {
            Some(path) => SelectionState::load(path).await?,
            None => SelectionState::new(),
        };

        info!(
            "🎞️ Collecting background for {} ({:?} mode)",
            span.scope_key(),
            selection.mode
        );

        let collector = Collector::new(
            &self.library,
            self.probe.as_ref(),
            self.config.collector_config(),
        );
        let result = collector
            .collect(&mut selector, &mut state, span, target_duration)
            .await?;

        if let Some(path) = &selection.state_file {
            state.save(path).await?;
        }

        Ok(result)
    }

    /// Concatenate collected clips in playback order
    pub async fn stitch_videos(&self, segments: &[VideoSegment]) -> Result<PathBuf> {
        let paths: Vec<&Path> = segments.iter().map(|segment| segment.path.as_path()).collect();
        self.stitcher.stitch(&paths, &self.work_dir).await
    }

    /// Path of the background to use for a span. Never fails: any problem
    /// falls back to the configured default background.
    pub async fn prepare_background_video(&self, span: VerseSpan, total_duration: f64) -> PathBuf {
        let default_background = self.config.output.default_background.clone();

        if !self.config.selection.enable_dynamic_backgrounds {
            debug!("Dynamic backgrounds disabled, using default background");
            return default_background;
        }

        match self.try_prepare(span, total_duration).await {
            Ok(Some(path)) => {
                info!("✅ Background video ready: {}", path.display());
                path
            }
            Ok(None) => {
                warn!("⚠️ No video segments collected, using default background");
                default_background
            }
            Err(e) => {
                warn!(
                    "⚠️ Dynamic background selection failed: {:#}, using default background",
                    e
                );
                default_background
            }
        }
    }

    async fn try_prepare(&self, span: VerseSpan, total_duration: f64) -> Result<Option<PathBuf>> {
        let result = self.collect_video_segments(span, total_duration).await?;
        if result.segments.is_empty() {
            return Ok(None);
        }

        let stitched = self.stitch_videos(&result.segments).await?;

        let final_duration = self.probe.probe_duration(&stitched).await;
        if final_duration > 0.0 && final_duration < total_duration {
            info!(
                "🔁 Background ({:.2}s) is shorter than the recitation ({:.2}s), will loop",
                final_duration, total_duration
            );
        }

        Ok(Some(stitched))
    }

    /// Remove the temporary directory unless `keep_temp_files` is set
    pub fn cleanup(&mut self) -> Result<()> {
        let Some(temp_dir) = self.temp_dir.take() else {
            return Ok(());
        };

        if self.config.output.keep_temp_files {
            let kept = temp_dir.keep();
            info!("📁 Keeping temporary files in {}", kept.display());
        } else {
            temp_dir.close()?;
            debug!("🧹 Removed {}", self.work_dir.display());
        }
        Ok(())
    }
}

impl Drop for BackgroundVideoManager {
    fn drop(&mut self) {
        if self.config.output.keep_temp_files {
            if let Some(temp_dir) = self.temp_dir.take() {
                let _ = temp_dir.keep();
            }
        }
    }
}
