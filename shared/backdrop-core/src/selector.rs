//! Theme and video selection with no repeats until a scope is exhausted

use crate::metadata::ThemeMetadata;
use crate::random::SeededRandom;
use crate::segments::{verse_range_segments, VerseRangeSegment, VerseSpan};
use crate::state::SelectionState;
use crate::{BackdropError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Draws themes and videos from the metadata using a seeded chooser.
///
/// The selector never holds selection history itself; every drawing call
/// takes the caller's [`SelectionState`].
#[derive(Debug, Clone)]
pub struct Selector {
    metadata: ThemeMetadata,
    random: SeededRandom,
}

impl Selector {
    pub fn new(metadata: ThemeMetadata, seed: u64) -> Self {
        Self {
            metadata,
            random: SeededRandom::new(seed),
        }
    }

    /// Load metadata from disk and seed the chooser
    pub async fn from_path<P: AsRef<Path>>(metadata_path: P, seed: u64) -> Result<Self> {
        let metadata = ThemeMetadata::load(metadata_path).await?;
        Ok(Self::new(metadata, seed))
    }

    pub fn metadata(&self) -> &ThemeMetadata {
        &self.metadata
    }

    /// Theme pool for a whole span
    pub fn themes_for_verses(&self, span: VerseSpan) -> Vec<String> {
        self.metadata.themes_for_verses(span.unit, span.from, span.to)
    }

    /// Per-range segments of a span
    pub fn verse_range_segments(&self, span: VerseSpan) -> Vec<VerseRangeSegment> {
        verse_range_segments(&self.metadata, span)
    }

    /// Pick a theme of one segment, restricted to themes with known videos.
    ///
    /// The theme is not marked exhausted here; the caller does that once a
    /// video has actually been drawn from it.
    pub fn select_theme_for_range(
        &mut self,
        segment: &VerseRangeSegment,
        theme_videos: &HashMap<String, Vec<String>>,
        state: &mut SelectionState,
    ) -> Result<String> {
        if segment.themes.is_empty() {
            return Err(BackdropError::NoAvailableTheme(segment.range_key.clone()));
        }

        let has_videos =
            |theme: &str| theme_videos.get(theme).map_or(false, |videos| !videos.is_empty());

        self.select_in_scope(&segment.themes, &segment.range_key, has_videos, state)?
            .ok_or_else(|| BackdropError::NoAvailableTheme(segment.range_key.clone()))
    }

    /// Pick a theme from a flat pool, scoped by a caller-chosen key
    pub fn select_theme(
        &mut self,
        themes: &[String],
        scope_key: &str,
        state: &mut SelectionState,
    ) -> Result<String> {
        if themes.is_empty() {
            return Err(BackdropError::EmptyInput(format!(
                "no themes to select from for {}",
                scope_key
            )));
        }

        self.select_in_scope(themes, scope_key, |_| true, state)?
            .ok_or_else(|| BackdropError::EmptyInput(scope_key.to_string()))
    }

    /// Shared filter/reset/choose over one exhaustion scope.
    ///
    /// `None` when no theme passes `eligible` even after the scope reset.
    fn select_in_scope<F>(
        &mut self,
        themes: &[String],
        scope_key: &str,
        eligible: F,
        state: &mut SelectionState,
    ) -> Result<Option<String>>
    where
        F: Fn(&str) -> bool,
    {
        let exhausted = state.exhausted_themes_mut(scope_key);

        let mut candidates: Vec<&String> = themes
            .iter()
            .filter(|theme| eligible(theme.as_str()) && !exhausted.contains(*theme))
            .collect();

        if candidates.is_empty() {
            if !exhausted.is_empty() {
                info!("🔄 All themes exhausted for {}, resetting", scope_key);
            }
            exhausted.clear();
            candidates = themes.iter().filter(|theme| eligible(theme.as_str())).collect();
        }

        if candidates.is_empty() {
            return Ok(None);
        }

        let theme = self.random.choice(&candidates)?;
        Ok(Some((*theme).clone()))
    }

    /// Pick a video of a theme that has not been used since the theme's last
    /// reset, and record it as used
    pub fn select_video_from_theme(
        &mut self,
        theme: &str,
        available_videos: &[String],
        state: &mut SelectionState,
    ) -> Result<String> {
        if available_videos.is_empty() {
            return Err(BackdropError::EmptyInput(format!(
                "no videos available in theme '{}'",
                theme
            )));
        }

        let used = state.used_videos_mut(theme);
        let mut unused: Vec<&String> = available_videos
            .iter()
            .filter(|video| !used.contains(*video))
            .collect();

        if unused.is_empty() {
            debug!("🔄 All videos in theme '{}' used, resetting", theme);
            used.clear();
            unused = available_videos.iter().collect();
        }

        let selected = (*self.random.choice(&unused)?).clone();
        used.insert(selected.clone());
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn selector(seed: u64) -> Selector {
        let metadata = ThemeMetadata::from_json_str(
            r#"{"19": {"10-15": ["desert", "mountain", "forest"], "16-20": ["ocean"]}}"#,
        )
        .unwrap();
        Selector::new(metadata, seed)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_videos_not_repeated_until_exhausted() {
        let mut selector = selector(99);
        let mut state = SelectionState::new();
        let videos = strings(&["a.mp4", "b.mp4", "c.mp4", "d.mp4"]);

        let mut seen = HashSet::new();
        for _ in 0..videos.len() {
            let video = selector
                .select_video_from_theme("desert", &videos, &mut state)
                .unwrap();
            assert!(seen.insert(video), "video repeated before exhaustion");
        }
        assert_eq!(seen.len(), videos.len());
        assert_eq!(state.used_count("desert"), 4);

        // Fifth pick resets the theme and starts a new cycle
        let video = selector
            .select_video_from_theme("desert", &videos, &mut state)
            .unwrap();
        assert!(videos.contains(&video));
        assert_eq!(state.used_count("desert"), 1);
    }

    #[test]
    fn test_video_from_empty_theme_fails() {
        let mut selector = selector(1);
        let mut state = SelectionState::new();
        let result = selector.select_video_from_theme("desert", &[], &mut state);
        assert!(matches!(result, Err(BackdropError::EmptyInput(_))));
    }

    #[test]
    fn test_flat_themes_not_repeated_until_exhausted() {
        let mut selector = selector(5);
        let mut state = SelectionState::new();
        let themes = strings(&["desert", "forest", "mountain", "ocean"]);

        let mut seen = HashSet::new();
        for _ in 0..themes.len() {
            let theme = selector.select_theme(&themes, "19:10-20", &mut state).unwrap();
            state.mark_theme_exhausted("19:10-20", &theme);
            assert!(seen.insert(theme));
        }

        // Scope is exhausted; the next call resets instead of failing
        let theme = selector.select_theme(&themes, "19:10-20", &mut state).unwrap();
        assert!(themes.contains(&theme));
        assert!(state.exhausted_themes_per_range["19:10-20"].is_empty());
    }

    #[test]
    fn test_flat_select_from_nothing_fails() {
        let mut selector = selector(5);
        let mut state = SelectionState::new();
        let result = selector.select_theme(&[], "19:10-20", &mut state);
        assert!(matches!(result, Err(BackdropError::EmptyInput(_))));
    }

    #[test]
    fn test_range_selection_skips_themes_without_videos() {
        let mut selector = selector(3);
        let mut state = SelectionState::new();
        let segment = selector.verse_range_segments(VerseSpan::new(19, 10, 20))[0].clone();

        let mut theme_videos = HashMap::new();
        theme_videos.insert("desert".to_string(), strings(&["d1.mp4"]));
        theme_videos.insert("mountain".to_string(), Vec::new());

        for _ in 0..10 {
            let theme = selector
                .select_theme_for_range(&segment, &theme_videos, &mut state)
                .unwrap();
            assert_eq!(theme, "desert");
            state.mark_theme_exhausted(&segment.range_key, &theme);
        }
    }

    #[test]
    fn test_range_selection_resets_exhausted_scope() {
        let mut selector = selector(11);
        let mut state = SelectionState::new();
        let segment = selector.verse_range_segments(VerseSpan::new(19, 10, 20))[0].clone();

        let mut theme_videos = HashMap::new();
        for theme in &segment.themes {
            theme_videos.insert(theme.clone(), strings(&["clip.mp4"]));
        }
        for theme in &segment.themes {
            state.mark_theme_exhausted(&segment.range_key, theme);
        }

        let theme = selector
            .select_theme_for_range(&segment, &theme_videos, &mut state)
            .unwrap();
        assert!(segment.themes.contains(&theme));
        assert!(!state.is_theme_exhausted(&segment.range_key, "desert"));
    }

    #[test]
    fn test_range_selection_without_any_videos_fails() {
        let mut selector = selector(11);
        let mut state = SelectionState::new();
        let segment = selector.verse_range_segments(VerseSpan::new(19, 16, 20))[0].clone();

        let result = selector.select_theme_for_range(&segment, &HashMap::new(), &mut state);
        assert!(matches!(result, Err(BackdropError::NoAvailableTheme(_))));
    }

    #[test]
    fn test_same_seed_same_choices() {
        let themes = strings(&["desert", "forest", "mountain", "ocean"]);
        let videos = strings(&["1", "2", "3", "4", "5"]);

        let run = |seed| {
            let mut selector = selector(seed);
            let mut state = SelectionState::new();
            (0..20)
                .map(|_| {
                    let theme = selector.select_theme(&themes, "scope", &mut state).unwrap();
                    state.mark_theme_exhausted("scope", &theme);
                    let video = selector
                        .select_video_from_theme(&theme, &videos, &mut state)
                        .unwrap();
                    (theme, video)
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(run(42), run(42));
    }
}
