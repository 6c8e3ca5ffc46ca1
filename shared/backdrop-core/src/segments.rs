//! Verse span segmentation and time-fraction mapping

use crate::metadata::ThemeMetadata;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A requested span of verses within one unit, inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseSpan {
    pub unit: u32,
    pub from: u32,
    pub to: u32,
}

impl VerseSpan {
    pub fn new(unit: u32, from: u32, to: u32) -> Self {
        Self { unit, from, to }
    }

    /// Descriptor used as the flat-selection scope key, e.g. `"19:10-20"`
    pub fn scope_key(&self) -> String {
        format!("{}:{}-{}", self.unit, self.from, self.to)
    }

    /// Number of verses in the span (0 when `from > to`)
    pub fn verse_count(&self) -> u64 {
        if self.from > self.to {
            0
        } else {
            u64::from(self.to) - u64::from(self.from) + 1
        }
    }
}

/// A contiguous piece of a span sharing one metadata range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerseRangeSegment {
    pub start_verse: u32,
    pub end_verse: u32,
    pub themes: Vec<String>,
    pub start_time_fraction: f64,
    pub end_time_fraction: f64,
    /// `"<unit>:<start>-<end>"` of the enclosing metadata range
    pub range_key: String,
}

impl VerseRangeSegment {
    pub fn verse_count(&self) -> u64 {
        u64::from(self.end_verse) - u64::from(self.start_verse) + 1
    }

    /// Whether a time fraction falls in `[start, end)`
    pub fn covers(&self, fraction: f64) -> bool {
        fraction >= self.start_time_fraction && fraction < self.end_time_fraction
    }
}

/// Split a span into per-range segments with proportional time windows.
///
/// Verses with no enclosing range are skipped. Segments are ordered by start
/// verse, fractions accumulate from 0.0 and the last one ends at exactly 1.0.
/// Returns an empty list when `from > to` or nothing matches.
pub fn verse_range_segments(metadata: &ThemeMetadata, span: VerseSpan) -> Vec<VerseRangeSegment> {
    if span.from > span.to {
        return Vec::new();
    }

    let mut segments: Vec<VerseRangeSegment> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for verse in span.from..=span.to {
        let Some((start, end)) = metadata.find_range_bounds_for_verse(span.unit, verse) else {
            continue;
        };
        let range_key = format!("{}:{}-{}", span.unit, start, end);

        match index_by_key.get(&range_key) {
            Some(&index) => {
                let segment = &mut segments[index];
                segment.start_verse = segment.start_verse.min(verse);
                segment.end_verse = segment.end_verse.max(verse);
            }
            None => {
                index_by_key.insert(range_key.clone(), segments.len());
                segments.push(VerseRangeSegment {
                    start_verse: verse,
                    end_verse: verse,
                    themes: metadata.find_range_for_verse(span.unit, verse).to_vec(),
                    start_time_fraction: 0.0,
                    end_time_fraction: 0.0,
                    range_key,
                });
            }
        }
    }

    segments.sort_by_key(|segment| segment.start_verse);

    let total_verses = span.verse_count() as f64;
    let mut current = 0.0;
    for segment in &mut segments {
        let fraction = segment.verse_count() as f64 / total_verses;
        segment.start_time_fraction = current;
        segment.end_time_fraction = current + fraction;
        current += fraction;
    }

    if let Some(last) = segments.last_mut() {
        last.end_time_fraction = 1.0;
    }

    segments
}

/// Segment playing at a time fraction.
///
/// First segment whose `[start, end)` contains the fraction; positions at or
/// past the end map to the last segment and positions before the start to the
/// first. `None` only for an empty list.
pub fn range_for_time_position(
    segments: &[VerseRangeSegment],
    fraction: f64,
) -> Option<&VerseRangeSegment> {
    if let Some(segment) = segments.iter().find(|segment| segment.covers(fraction)) {
        return Some(segment);
    }

    let first = segments.first()?;
    if fraction < first.start_time_fraction {
        Some(first)
    } else {
        segments.last()
    }
}
