//! Run-scoped bookkeeping of used videos and exhausted themes

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Mutable selection history, owned by the caller and lent to every selection
/// call. Entries are created lazily; a missing entry means nothing is used yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    /// Theme -> video ids chosen since that theme's last reset
    pub used_videos: BTreeMap<String, BTreeSet<String>>,

    /// Scope key -> themes chosen since that scope's last reset
    pub exhausted_themes_per_range: BTreeMap<String, BTreeSet<String>>,
}

/// On-disk form of a retained state
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateSnapshot {
    saved_at: DateTime<Utc>,
    state: SelectionState,
}

impl SelectionState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Used set for a theme, created on first access
    pub fn used_videos_mut(&mut self, theme: &str) -> &mut BTreeSet<String> {
        self.used_videos.entry(theme.to_string()).or_default()
    }

    /// Exhausted set for a scope, created on first access
    pub fn exhausted_themes_mut(&mut self, scope_key: &str) -> &mut BTreeSet<String> {
        self.exhausted_themes_per_range
            .entry(scope_key.to_string())
            .or_default()
    }

    /// Record that a theme has been drawn from within a scope
    pub fn mark_theme_exhausted(&mut self, scope_key: &str, theme: &str) {
        self.exhausted_themes_mut(scope_key).insert(theme.to_string());
    }

    pub fn is_theme_exhausted(&self, scope_key: &str, theme: &str) -> bool {
        self.exhausted_themes_per_range
            .get(scope_key)
            .map_or(false, |themes| themes.contains(theme))
    }

    pub fn is_video_used(&self, theme: &str, video_id: &str) -> bool {
        self.used_videos
            .get(theme)
            .map_or(false, |videos| videos.contains(video_id))
    }

    /// Number of videos used for a theme since its last reset
    pub fn used_count(&self, theme: &str) -> usize {
        self.used_videos.get(theme).map_or(0, BTreeSet::len)
    }

    /// Forget the exhausted themes of one scope
    pub fn reset_scope(&mut self, scope_key: &str) {
        if let Some(themes) = self.exhausted_themes_per_range.get_mut(scope_key) {
            themes.clear();
        }
    }

    /// Forget every used video, across all themes
    pub fn reset_all_videos(&mut self) {
        self.used_videos.clear();
    }

    /// Forget everything
    pub fn reset_all(&mut self) {
        self.used_videos.clear();
        self.exhausted_themes_per_range.clear();
    }

    /// Load a retained state; a missing file yields an empty state
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No selection state at {}, starting fresh", path.display());
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).await?;
        let snapshot: StateSnapshot = serde_json::from_str(&content)?;
        info!(
            "📋 Loaded selection state from {} (saved {})",
            path.display(),
            snapshot.saved_at.to_rfc3339()
        );
        Ok(snapshot.state)
    }

    /// Persist the state as pretty JSON
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let snapshot = StateSnapshot {
            saved_at: Utc::now(),
            state: self.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&snapshot)?).await?;

        debug!("💾 Saved selection state to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lazy_entries() {
        let mut state = SelectionState::new();
        assert_eq!(state.used_count("desert"), 0);
        assert!(!state.is_video_used("desert", "desert/a.mp4"));

        state.used_videos_mut("desert").insert("desert/a.mp4".to_string());
        assert_eq!(state.used_count("desert"), 1);
        assert!(state.is_video_used("desert", "desert/a.mp4"));
    }

    #[test]
    fn test_scope_reset_is_isolated() {
        let mut state = SelectionState::new();
        state.mark_theme_exhausted("19:10-15", "desert");
        state.mark_theme_exhausted("19:16-20", "ocean");

        state.reset_scope("19:10-15");
        assert!(!state.is_theme_exhausted("19:10-15", "desert"));
        assert!(state.is_theme_exhausted("19:16-20", "ocean"));

        state.reset_all();
        assert!(state.exhausted_themes_per_range.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("selection.json");

        let mut state = SelectionState::new();
        state.used_videos_mut("ocean").insert("ocean/waves.mp4".to_string());
        state.mark_theme_exhausted("19:10-20", "ocean");
        state.save(&path).await.unwrap();

        let loaded = SelectionState::load(&path).await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = SelectionState::load(&temp_dir.path().join("none.json"))
            .await
            .unwrap();
        assert_eq!(loaded, SelectionState::new());
    }
}
