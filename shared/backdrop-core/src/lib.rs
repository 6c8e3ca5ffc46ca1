//! Backdrop Core - theme lookup, verse segmentation and no-repeat selection
//! of background footage for a span of verses.

pub mod metadata;
pub mod random;
pub mod state;
pub mod segments;
pub mod selector;
pub mod collector;

pub use metadata::{RangeEntry, ThemeMetadata};
pub use random::SeededRandom;
pub use state::SelectionState;
pub use segments::{range_for_time_position, VerseRangeSegment, VerseSpan};
pub use selector::Selector;
pub use collector::{
    CollectionMode, CollectionResult, CollectionRun, Collector, CollectorConfig, DurationProbe,
    StepOutcome, StopReason, VideoSegment, VideoSource, DEFAULT_MAX_ITERATIONS,
};

/// Result type for Backdrop Core operations
pub type Result<T> = std::result::Result<T, BackdropError>;

/// Error types for Backdrop Core operations
#[derive(thiserror::Error, Debug)]
pub enum BackdropError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid theme metadata: {0}")]
    Format(String),

    #[error("Cannot choose from empty input: {0}")]
    EmptyInput(String),

    #[error("No themes with videos available for range: {0}")]
    NoAvailableTheme(String),

    #[error("No themes available for verses: {0}")]
    NoThemes(String),

    #[error("Video retrieval failed: {0}")]
    Retrieval(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
