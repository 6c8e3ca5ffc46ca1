//! Duration-target collection loop over external video collaborators

use crate::segments::{range_for_time_position, VerseRangeSegment, VerseSpan};
use crate::selector::Selector;
use crate::state::SelectionState;
use crate::{BackdropError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Iterations after which a collection stops even if the target is unmet
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Catalog of footage grouped by theme
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Video ids of a theme. Errors are treated as an empty listing.
    async fn list_videos(&self, theme: &str) -> Result<Vec<String>>;

    /// Fetch a video to a local path. Errors abort the collection run.
    async fn download(&self, video_id: &str) -> Result<PathBuf>;
}

/// Measures clip length
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration in seconds, 0.0 when unknown or unreadable
    async fn probe_duration(&self, path: &Path) -> f64;
}

/// One accepted clip of a collection, in playback order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSegment {
    pub path: PathBuf,
    pub theme: String,
    pub video_id: String,
    pub duration: f64,
    pub is_local: bool,
}

/// How themes are drawn during a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollectionMode {
    /// One theme pool for the whole span, scoped by the span descriptor
    #[default]
    Flat,

    /// Themes of the verse range playing at the current position
    PerRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Safety bound on loop iterations (accepted, rejected or skipped)
    pub max_iterations: usize,

    pub mode: CollectionMode,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            mode: CollectionMode::Flat,
        }
    }
}

impl CollectorConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_mode(mut self, mode: CollectionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Why a collection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    TargetReached,
    IterationLimit,
    /// The caller stopped stepping before either condition was met
    Stopped,
}

/// Result of one loop iteration
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Accepted(VideoSegment),
    /// The theme has no videos and was marked exhausted for its scope
    EmptyTheme(String),
    /// The probe reported a non-positive duration; the pick was dropped
    InvalidDuration { theme: String, video_id: String },
    /// Nothing was done; the run is over
    Finished(StopReason),
}

/// Outcome of a whole collection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResult {
    pub segments: Vec<VideoSegment>,
    pub total_duration: f64,
    pub target_duration: f64,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

impl CollectionResult {
    pub fn meets_target(&self) -> bool {
        self.total_duration >= self.target_duration
    }

    /// Local paths in playback order, as the stitcher must receive them
    pub fn paths(&self) -> Vec<&Path> {
        self.segments.iter().map(|segment| segment.path.as_path()).collect()
    }
}

enum ThemePlan {
    Flat {
        themes: Vec<String>,
        scope_key: String,
    },
    PerRange {
        segments: Vec<VerseRangeSegment>,
        pool: Vec<String>,
    },
}

impl ThemePlan {
    fn pool(&self) -> &[String] {
        match self {
            ThemePlan::Flat { themes, .. } => themes.as_slice(),
            ThemePlan::PerRange { pool, .. } => pool.as_slice(),
        }
    }

    fn scope_keys(&self) -> Vec<String> {
        match self {
            ThemePlan::Flat { scope_key, .. } => vec![scope_key.clone()],
            ThemePlan::PerRange { segments, .. } => segments
                .iter()
                .map(|segment| segment.range_key.clone())
                .collect(),
        }
    }
}

/// Entry point binding the external collaborators to a loop configuration
pub struct Collector<'a> {
    source: &'a dyn VideoSource,
    probe: &'a dyn DurationProbe,
    config: CollectorConfig,
}

impl<'a> Collector<'a> {
    pub fn new(
        source: &'a dyn VideoSource,
        probe: &'a dyn DurationProbe,
        config: CollectorConfig,
    ) -> Self {
        Self {
            source,
            probe,
            config,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Prepare a run for a verse span in the configured mode.
    ///
    /// Fails with `NoThemes` when no verse of the span has themes.
    pub fn begin<'r>(
        &'r self,
        selector: &'r mut Selector,
        state: &'r mut SelectionState,
        span: VerseSpan,
        target_duration: f64,
    ) -> Result<CollectionRun<'r>> {
        let plan = match self.config.mode {
            CollectionMode::Flat => ThemePlan::Flat {
                themes: selector.themes_for_verses(span),
                scope_key: span.scope_key(),
            },
            CollectionMode::PerRange => {
                let segments = selector.verse_range_segments(span);
                let pool: BTreeSet<String> = segments
                    .iter()
                    .flat_map(|segment| segment.themes.iter().cloned())
                    .collect();
                ThemePlan::PerRange {
                    segments,
                    pool: pool.into_iter().collect(),
                }
            }
        };

        if plan.pool().is_empty() {
            return Err(BackdropError::NoThemes(span.scope_key()));
        }

        Ok(self.start(selector, state, plan, target_duration))
    }

    /// Prepare a flat run over an explicit theme pool
    pub fn begin_with_themes<'r>(
        &'r self,
        selector: &'r mut Selector,
        state: &'r mut SelectionState,
        themes: Vec<String>,
        scope_key: impl Into<String>,
        target_duration: f64,
    ) -> Result<CollectionRun<'r>> {
        let scope_key = scope_key.into();
        if themes.is_empty() {
            return Err(BackdropError::NoThemes(scope_key));
        }

        let plan = ThemePlan::Flat { themes, scope_key };
        Ok(self.start(selector, state, plan, target_duration))
    }

    /// Run a whole collection for a span
    pub async fn collect(
        &self,
        selector: &mut Selector,
        state: &mut SelectionState,
        span: VerseSpan,
        target_duration: f64,
    ) -> Result<CollectionResult> {
        self.begin(selector, state, span, target_duration)?.run().await
    }

    fn start<'r>(
        &'r self,
        selector: &'r mut Selector,
        state: &'r mut SelectionState,
        plan: ThemePlan,
        target_duration: f64,
    ) -> CollectionRun<'r> {
        debug!("Theme pool: {}", plan.pool().join(", "));
        CollectionRun {
            selector,
            state,
            source: self.source,
            probe: self.probe,
            max_iterations: self.config.max_iterations,
            plan,
            target_duration,
            listings: HashMap::new(),
            segments: Vec::new(),
            total_duration: 0.0,
            iterations: 0,
        }
    }
}

/// A collection in progress. Drive it with [`CollectionRun::step`] or
/// [`CollectionRun::run`]; stopping between steps is always safe.
pub struct CollectionRun<'a> {
    selector: &'a mut Selector,
    state: &'a mut SelectionState,
    source: &'a dyn VideoSource,
    probe: &'a dyn DurationProbe,
    max_iterations: usize,
    plan: ThemePlan,
    target_duration: f64,
    /// Listing per theme, fetched once per run
    listings: HashMap<String, Vec<String>>,
    segments: Vec<VideoSegment>,
    total_duration: f64,
    iterations: usize,
}

impl<'a> CollectionRun<'a> {
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn target_duration(&self) -> f64 {
        self.target_duration
    }

    pub fn segments(&self) -> &[VideoSegment] {
        &self.segments
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn stop_condition(&self) -> Option<StopReason> {
        if self.total_duration >= self.target_duration {
            Some(StopReason::TargetReached)
        } else if self.iterations >= self.max_iterations {
            Some(StopReason::IterationLimit)
        } else {
            None
        }
    }

    pub fn is_finished(&self) -> bool {
        self.stop_condition().is_some()
    }

    /// Perform one iteration: pick a theme, list it, pick a video, fetch and
    /// measure it.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        if let Some(reason) = self.stop_condition() {
            if reason == StopReason::IterationLimit {
                warn!(
                    "⚠️ Reached iteration limit ({}), stopping collection",
                    self.max_iterations
                );
            }
            return Ok(StepOutcome::Finished(reason));
        }
        self.iterations += 1;

        let (theme, scope_key) = match &self.plan {
            ThemePlan::Flat { themes, scope_key } => {
                let theme = self.selector.select_theme(themes, scope_key, self.state)?;
                (theme, scope_key.clone())
            }
            ThemePlan::PerRange { segments, .. } => {
                let position = (self.total_duration / self.target_duration).clamp(0.0, 1.0);
                let segment = range_for_time_position(segments, position)
                    .cloned()
                    .ok_or_else(|| BackdropError::NoThemes("no verse segments".to_string()))?;

                for theme in &segment.themes {
                    self.ensure_listing(theme).await;
                }

                let theme =
                    self.selector
                        .select_theme_for_range(&segment, &self.listings, self.state)?;
                (theme, segment.range_key)
            }
        };

        self.ensure_listing(&theme).await;
        let videos = &self.listings[&theme];
        if videos.is_empty() {
            warn!("⚠️ No videos found for theme '{}', skipping", theme);
            self.state.mark_theme_exhausted(&scope_key, &theme);
            return Ok(StepOutcome::EmptyTheme(theme));
        }

        let video_id = match self
            .selector
            .select_video_from_theme(&theme, videos, self.state)
        {
            Ok(video_id) => video_id,
            Err(BackdropError::EmptyInput(reason)) => {
                warn!("⚠️ Skipping theme '{}': {}", theme, reason);
                self.state.mark_theme_exhausted(&scope_key, &theme);
                return Ok(StepOutcome::EmptyTheme(theme));
            }
            Err(e) => return Err(e),
        };
        self.state.mark_theme_exhausted(&scope_key, &theme);

        let path = self.source.download(&video_id).await?;
        let duration = self.probe.probe_duration(&path).await;
        if !(duration > 0.0) {
            warn!("⚠️ Invalid duration for {}, skipping", video_id);
            return Ok(StepOutcome::InvalidDuration { theme, video_id });
        }

        let segment = VideoSegment {
            path,
            theme,
            video_id,
            duration,
            is_local: true,
        };
        self.total_duration += duration;
        self.segments.push(segment.clone());

        info!(
            "🎬 Segment {} - theme: {}, video: {}, duration: {:.2}s",
            self.segments.len(),
            segment.theme,
            segment.video_id,
            duration
        );

        if self.total_duration < self.target_duration && self.all_videos_used() {
            // Also retries themes whose listing was empty; those are skipped again
            info!("🔄 All unique videos used, resetting selection state");
            self.state.reset_all_videos();
            for scope_key in self.plan.scope_keys() {
                self.state.reset_scope(&scope_key);
            }
        }

        Ok(StepOutcome::Accepted(segment))
    }

    /// Step until the target is met or the iteration bound is hit
    pub async fn run(mut self) -> Result<CollectionResult> {
        info!("🎯 Target duration: {:.2}s", self.target_duration);

        loop {
            if let StepOutcome::Finished(_) = self.step().await? {
                break;
            }
        }

        let result = self.finish();
        info!(
            "✅ Collected {} segments, total duration: {:.2}s",
            result.segments.len(),
            result.total_duration
        );
        Ok(result)
    }

    /// Stop here and hand back what has been accepted so far
    pub fn finish(self) -> CollectionResult {
        let stop_reason = self.stop_condition().unwrap_or(StopReason::Stopped);
        CollectionResult {
            segments: self.segments,
            total_duration: self.total_duration,
            target_duration: self.target_duration,
            iterations: self.iterations,
            stop_reason,
        }
    }

    async fn ensure_listing(&mut self, theme: &str) {
        if self.listings.contains_key(theme) {
            return;
        }

        let videos = match self.source.list_videos(theme).await {
            Ok(videos) => videos,
            Err(e) => {
                warn!("Failed to list videos for theme '{}': {}", theme, e);
                Vec::new()
            }
        };
        debug!("📁 Theme '{}' has {} videos", theme, videos.len());
        self.listings.insert(theme.to_string(), videos);
    }

    /// True when no theme with a known, non-empty listing has an unused video
    fn all_videos_used(&self) -> bool {
        self.plan.pool().iter().all(|theme| match self.listings.get(theme) {
            Some(videos) => videos
                .iter()
                .all(|video| self.state.is_video_used(theme, video)),
            None => true,
        })
    }
}
