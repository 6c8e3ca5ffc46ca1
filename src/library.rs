use async_trait::async_trait;
use backdrop_core::{BackdropError, Result, VideoSource};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;
use walkdir::WalkDir;

/// Footage library on the local filesystem, one directory per theme.
///
/// Video ids are `"<theme>/<file name>"`. Downloads copy the clip into the
/// run's work directory under a numbered name so repeated picks of the same
/// clip never collide.
pub struct LocalLibrary {
    root: PathBuf,
    work_dir: PathBuf,
    extensions: Vec<String>,
    downloads: AtomicUsize,
}

impl LocalLibrary {
    pub fn new(root: PathBuf, work_dir: PathBuf, extensions: Vec<String>) -> Self {
        Self {
            root,
            work_dir,
            extensions: extensions.into_iter().map(|e| e.to_lowercase()).collect(),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of clips copied so far
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn is_video_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| self.extensions.contains(&ext.to_lowercase()))
    }
}

#[async_trait]
impl VideoSource for LocalLibrary {
    async fn list_videos(&self, theme: &str) -> Result<Vec<String>> {
        let theme_dir = self.root.join(theme);
        if !theme_dir.is_dir() {
            debug!("No directory for theme '{}' in {}", theme, self.root.display());
            return Ok(Vec::new());
        }

        let mut videos = Vec::new();
        for entry in WalkDir::new(&theme_dir).min_depth(1).max_depth(1) {
            let entry = entry
                .map_err(|e| BackdropError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
            let path = entry.path();

            if entry.file_type().is_file() && self.is_video_file(path) {
                if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                    videos.push(format!("{}/{}", theme, name));
                }
            }
        }

        videos.sort();
        Ok(videos)
    }

    async fn download(&self, video_id: &str) -> Result<PathBuf> {
        let source = self.root.join(video_id);
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| BackdropError::Retrieval(format!("invalid video id '{}'", video_id)))?
            .to_string();

        if !source.is_file() {
            return Err(BackdropError::NotFound(source.display().to_string()));
        }

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let index = self.downloads.fetch_add(1, Ordering::SeqCst) + 1;
        let destination = self.work_dir.join(format!("{}_{}", index, file_name));

        tokio::fs::copy(&source, &destination).await.map_err(|e| {
            BackdropError::Retrieval(format!("failed to copy {}: {}", video_id, e))
        })?;

        debug!("📥 {} -> {}", video_id, destination.display());
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library_with(files: &[&str]) -> (TempDir, LocalLibrary) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("library");
        for file in files {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, file.as_bytes()).unwrap();
        }

        let library = LocalLibrary::new(
            root,
            temp_dir.path().join("work"),
            vec!["mp4".to_string(), "MOV".to_string()],
        );
        (temp_dir, library)
    }

    #[tokio::test]
    async fn test_listing_is_sorted_and_filtered() {
        let (_temp_dir, library) = library_with(&[
            "desert/sunset.mp4",
            "desert/dunes.MOV",
            "desert/notes.txt",
            "desert/nested/deep.mp4",
            "ocean/waves.mp4",
        ]);

        let videos = library.list_videos("desert").await.unwrap();
        assert_eq!(videos, vec!["desert/dunes.MOV", "desert/sunset.mp4"]);
    }

    #[tokio::test]
    async fn test_missing_theme_lists_nothing() {
        let (_temp_dir, library) = library_with(&["ocean/waves.mp4"]);
        assert!(library.list_videos("forest").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_copies_with_numbered_names() {
        let (temp_dir, library) = library_with(&["ocean/waves.mp4"]);

        let first = library.download("ocean/waves.mp4").await.unwrap();
        let second = library.download("ocean/waves.mp4").await.unwrap();

        assert_eq!(first, temp_dir.path().join("work").join("1_waves.mp4"));
        assert_eq!(second, temp_dir.path().join("work").join("2_waves.mp4"));
        assert_eq!(std::fs::read(&first).unwrap(), b"ocean/waves.mp4");
        assert_eq!(library.download_count(), 2);
    }

    #[tokio::test]
    async fn test_download_missing_clip_fails() {
        let (_temp_dir, library) = library_with(&["ocean/waves.mp4"]);
        let result = library.download("ocean/missing.mp4").await;
        assert!(matches!(result, Err(BackdropError::NotFound(_))));
    }
}
