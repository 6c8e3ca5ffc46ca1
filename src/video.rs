use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use backdrop_core::DurationProbe;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the concatenated background inside the work directory
pub const STITCHED_FILE_NAME: &str = "background_stitched.mp4";

/// Clip length via the `ffprobe` command line tool
#[derive(Debug, Clone, Default)]
pub struct FfprobeDurationProbe;

impl FfprobeDurationProbe {
    pub fn new() -> Self {
        Self
    }

    async fn try_probe(&self, path: &Path) -> Result<f64> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-show_entries"),
                OsStr::new("format=duration"),
                OsStr::new("-of"),
                OsStr::new("default=noprint_wrappers=1:nokey=1"),
                path.as_os_str(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", path.display()));
        }

        let stdout = String::from_utf8(output.stdout)?;
        let duration = stdout.trim().parse::<f64>()?;
        Ok(duration)
    }
}

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn probe_duration(&self, path: &Path) -> f64 {
        match self.try_probe(path).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!("Failed to read duration of {}: {}", path.display(), e);
                0.0
            }
        }
    }
}

/// Concatenates collected clips into one background with the ffmpeg concat
/// demuxer. Streams are copied, never re-encoded.
#[derive(Debug, Clone, Default)]
pub struct VideoStitcher;

impl VideoStitcher {
    pub fn new() -> Self {
        Self
    }

    /// Stitch clips in the given order.
    ///
    /// A single clip is returned unchanged; otherwise the result is
    /// `background_stitched.mp4` in `work_dir`.
    pub async fn stitch<P: AsRef<Path>>(&self, clips: &[P], work_dir: &Path) -> Result<PathBuf> {
        match clips {
            [] => Err(anyhow!("No video segments to stitch")),
            [single] => {
                debug!("Single segment, no stitching needed");
                Ok(single.as_ref().to_path_buf())
            }
            _ => {
                tokio::fs::create_dir_all(work_dir).await?;

                let list_path = work_dir.join("concat.txt");
                tokio::fs::write(&list_path, concat_list(clips)?)
                    .await
                    .with_context(|| format!("Failed to write {}", list_path.display()))?;

                let output_path = work_dir.join(STITCHED_FILE_NAME);
                info!("🧵 Stitching {} segments", clips.len());

                let output = tokio::process::Command::new("ffmpeg")
                    .args([
                        OsStr::new("-y"),
                        OsStr::new("-f"),
                        OsStr::new("concat"),
                        OsStr::new("-safe"),
                        OsStr::new("0"),
                        OsStr::new("-i"),
                        list_path.as_os_str(),
                        OsStr::new("-c"),
                        OsStr::new("copy"),
                        OsStr::new("-movflags"),
                        OsStr::new("+faststart"),
                        output_path.as_os_str(),
                    ])
                    .output()
                    .await
                    .context("Failed to run ffmpeg")?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(anyhow!("Video stitching failed: {}", stderr.trim()));
                }

                info!("✅ Stitched background: {}", output_path.display());
                Ok(output_path)
            }
        }
    }
}

/// Concat-demuxer list with one `file '<absolute path>'` line per clip
pub fn concat_list<P: AsRef<Path>>(clips: &[P]) -> Result<String> {
    let current_dir = std::env::current_dir()?;
    let mut list = String::new();

    for clip in clips {
        let clip = clip.as_ref();
        let absolute = if clip.is_absolute() {
            clip.to_path_buf()
        } else {
            current_dir.join(clip)
        };
        let escaped = absolute.to_string_lossy().replace('\'', r"'\''");
        list.push_str(&format!("file '{}'\n", escaped));
    }

    Ok(list)
}
