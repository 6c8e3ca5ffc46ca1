use anyhow::{anyhow, Context, Result};
use backdrop_core::{CollectionMode, CollectorConfig, DEFAULT_MAX_ITERATIONS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for verse background selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Theme and video selection settings
    pub selection: SelectionConfig,

    /// Local footage library settings
    pub library: LibraryConfig,

    /// Output and temporary file settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Use themed footage; when false the default background is always used
    pub enable_dynamic_backgrounds: bool,

    /// Path to the theme metadata JSON
    pub theme_metadata_path: PathBuf,

    /// Seed for the deterministic chooser
    pub seed: u64,

    /// Safety bound on collection loop iterations
    pub max_iterations: usize,

    /// Theme drawing granularity
    pub mode: CollectionMode,

    /// Retain selection history between runs in this file
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory with one sub-directory per theme
    pub root_dir: PathBuf,

    /// Video file extensions listed from theme directories
    pub supported_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Static clip used whenever themed footage cannot be prepared
    pub default_background: PathBuf,

    /// Parent directory for the per-run temporary directory
    pub work_dir: Option<PathBuf>,

    /// Keep downloaded and stitched files after cleanup
    pub keep_temp_files: bool,

    /// Log level
    pub log_level: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            enable_dynamic_backgrounds: true,
            theme_metadata_path: PathBuf::from("config/theme_metadata.json"),
            seed: 99,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            mode: CollectionMode::Flat,
            state_file: None,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("backgrounds"),
            supported_extensions: vec![
                "mp4".to_string(),
                "mov".to_string(),
                "avi".to_string(),
                "mkv".to_string(),
                "webm".to_string(),
            ],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_background: PathBuf::from("assets/default_background.mp4"),
            work_dir: None,
            keep_temp_files: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found, then the environment
    pub fn load() -> Result<Self> {
        let config_paths = ["verse-backdrop.toml", "config/verse-backdrop.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults overridden by `VERSE_BACKDROP_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(seed) = std::env::var("VERSE_BACKDROP_SEED") {
            config.selection.seed = seed.parse().unwrap_or(config.selection.seed);
        }

        if let Ok(path) = std::env::var("VERSE_BACKDROP_METADATA") {
            config.selection.theme_metadata_path = PathBuf::from(path);
        }

        if let Ok(root) = std::env::var("VERSE_BACKDROP_LIBRARY") {
            config.library.root_dir = PathBuf::from(root);
        }

        if let Ok(iterations) = std::env::var("VERSE_BACKDROP_MAX_ITERATIONS") {
            config.selection.max_iterations =
                iterations.parse().unwrap_or(DEFAULT_MAX_ITERATIONS);
        }

        if let Ok(log_level) = std::env::var("VERSE_BACKDROP_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.selection.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be greater than 0"));
        }

        if self.library.supported_extensions.is_empty() {
            return Err(anyhow!("supported_extensions must not be empty"));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Loop settings handed to the collector
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig::default()
            .with_max_iterations(self.selection.max_iterations)
            .with_mode(self.selection.mode)
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Verse Backdrop Configuration:\n\
            - Dynamic Backgrounds: {}\n\
            - Theme Metadata: {}\n\
            - Seed: {}\n\
            - Mode: {:?}\n\
            - Max Iterations: {}\n\
            - Library: {}\n\
            - Supported Extensions: {}\n\
            - Default Background: {}",
            self.selection.enable_dynamic_backgrounds,
            self.selection.theme_metadata_path.display(),
            self.selection.seed,
            self.selection.mode,
            self.selection.max_iterations,
            self.library.root_dir.display(),
            self.library.supported_extensions.join(", "),
            self.output.default_background.display()
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.selection.seed = seed;
        self
    }

    pub fn with_metadata_path(mut self, path: PathBuf) -> Self {
        self.config.selection.theme_metadata_path = path;
        self
    }

    pub fn with_library_dir(mut self, dir: PathBuf) -> Self {
        self.config.library.root_dir = dir;
        self
    }

    pub fn with_default_background(mut self, path: PathBuf) -> Self {
        self.config.output.default_background = path;
        self
    }

    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.work_dir = Some(dir);
        self
    }

    pub fn with_state_file(mut self, path: PathBuf) -> Self {
        self.config.selection.state_file = Some(path);
        self
    }

    pub fn with_mode(mut self, mode: CollectionMode) -> Self {
        self.config.selection.mode = mode;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.selection.max_iterations = max_iterations;
        self
    }

    pub fn enable_dynamic_backgrounds(mut self, enable: bool) -> Self {
        self.config.selection.enable_dynamic_backgrounds = enable;
        self
    }

    pub fn keep_temp_files(mut self, keep: bool) -> Self {
        self.config.output.keep_temp_files = keep;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
