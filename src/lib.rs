//! Verse Backdrop - themed background footage for verse recitation videos
//!
//! Picks clips from a local footage library according to the themes of the
//! recited verses, collects enough of them to cover the recitation and
//! stitches them into one background.

pub mod background;
pub mod config;
pub mod library;
pub mod video;

// Re-export main types for easy access
pub use crate::background::BackgroundVideoManager;
pub use crate::config::{Config, ConfigBuilder};
pub use crate::library::LocalLibrary;
pub use crate::video::{FfprobeDurationProbe, VideoStitcher};

pub use backdrop_core::{
    CollectionMode, CollectionResult, DurationProbe, SelectionState, Selector, StopReason,
    ThemeMetadata, VerseRangeSegment, VerseSpan, VideoSegment, VideoSource,
};
