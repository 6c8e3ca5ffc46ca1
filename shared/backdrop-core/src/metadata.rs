//! Theme metadata: unit id -> verse range -> ordered theme names

use crate::{BackdropError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// One `"<start>-<end>"` entry of a unit, verses inclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeEntry {
    /// Raw key as it appears in the metadata file
    pub key: String,

    /// First verse covered
    pub start: u32,

    /// Last verse covered
    pub end: u32,

    /// Theme names in stored order
    pub themes: Vec<String>,
}

impl RangeEntry {
    /// Check whether a verse falls inside this range
    pub fn contains(&self, verse: u32) -> bool {
        verse >= self.start && verse <= self.end
    }
}

/// Immutable theme lookup table, loaded once
#[derive(Debug, Clone, Default)]
pub struct ThemeMetadata {
    /// Ranges per unit, kept in the order they appear in the source document
    units: HashMap<u32, Vec<RangeEntry>>,
}

impl ThemeMetadata {
    /// Load metadata from a JSON file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            BackdropError::NotFound(format!("{}: {}", path.display(), e))
        })?;

        let metadata = Self::from_json_str(&content)?;
        info!(
            "📚 Loaded theme metadata from {} ({} units)",
            path.display(),
            metadata.unit_count()
        );
        Ok(metadata)
    }

    /// Parse metadata from a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| BackdropError::Format(e.to_string()))?;
        Self::from_value(value)
    }

    /// Build metadata from an already parsed JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let root = match value {
            Value::Object(map) => map,
            other => {
                return Err(BackdropError::Format(format!(
                    "expected an object of units, found {}",
                    json_kind(&other)
                )))
            }
        };

        let mut units = HashMap::new();
        for (unit_key, ranges) in root {
            let unit: u32 = unit_key.trim().parse().map_err(|_| {
                BackdropError::Format(format!("unit id '{}' is not an integer", unit_key))
            })?;

            let ranges = match ranges {
                Value::Object(map) => map,
                other => {
                    return Err(BackdropError::Format(format!(
                        "unit {} must map to an object of ranges, found {}",
                        unit,
                        json_kind(&other)
                    )))
                }
            };

            let mut entries = Vec::with_capacity(ranges.len());
            for (range_key, themes) in ranges {
                // Keys without a dash are not ranges and are ignored
                let Some((start, end)) = parse_range_key(&range_key)? else {
                    debug!("Skipping non-range key '{}' in unit {}", range_key, unit);
                    continue;
                };

                let themes: Vec<String> = serde_json::from_value(themes).map_err(|_| {
                    BackdropError::Format(format!(
                        "themes for {}:{} must be an array of strings",
                        unit, range_key
                    ))
                })?;

                // A range without themes covers nothing
                if themes.is_empty() {
                    debug!("Skipping range '{}' in unit {} with no themes", range_key, unit);
                    continue;
                }

                entries.push(RangeEntry {
                    key: range_key,
                    start,
                    end,
                    themes,
                });
            }

            units.insert(unit, entries);
        }

        Ok(Self { units })
    }

    /// Number of units described
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Ranges of a unit in stored order (empty for unknown units)
    pub fn ranges(&self, unit: u32) -> &[RangeEntry] {
        self.units.get(&unit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First range of the unit containing the verse
    fn find_entry(&self, unit: u32, verse: u32) -> Option<&RangeEntry> {
        self.ranges(unit).iter().find(|entry| entry.contains(verse))
    }

    /// Themes of the first range containing the verse, empty when nothing matches
    pub fn find_range_for_verse(&self, unit: u32, verse: u32) -> &[String] {
        self.find_entry(unit, verse)
            .map(|entry| entry.themes.as_slice())
            .unwrap_or(&[])
    }

    /// Bounds of the first range containing the verse
    pub fn find_range_bounds_for_verse(&self, unit: u32, verse: u32) -> Option<(u32, u32)> {
        self.find_entry(unit, verse).map(|entry| (entry.start, entry.end))
    }

    /// Union of the themes of every verse in `[from, to]`, sorted and deduplicated.
    ///
    /// An empty result means no verse in the span is covered; callers treat that
    /// as fatal.
    pub fn themes_for_verses(&self, unit: u32, from: u32, to: u32) -> Vec<String> {
        let mut themes = BTreeSet::new();
        if from <= to {
            for verse in from..=to {
                themes.extend(self.find_range_for_verse(unit, verse).iter().cloned());
            }
        }
        themes.into_iter().collect()
    }
}

/// Parse `"<start>-<end>"`. `Ok(None)` when the key has no dash.
fn parse_range_key(key: &str) -> Result<Option<(u32, u32)>> {
    let Some((start, end)) = key.split_once('-') else {
        return Ok(None);
    };

    let parse = |part: &str| {
        part.trim().parse::<u32>().map_err(|_| {
            BackdropError::Format(format!("range key '{}' has a non-numeric bound", key))
        })
    };

    Ok(Some((parse(start)?, parse(end)?)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "19": { "10-15": ["desert", "mountain"], "16-20": ["ocean"] },
        "2": { "1-5": ["forest"], "note": "ignored", "4-8": ["rain"] }
    }"#;

    #[test]
    fn test_find_range_for_verse() {
        let metadata = ThemeMetadata::from_json_str(SAMPLE).unwrap();

        assert_eq!(metadata.find_range_for_verse(19, 12), ["desert", "mountain"]);
        assert_eq!(metadata.find_range_for_verse(19, 16), ["ocean"]);
        assert!(metadata.find_range_for_verse(19, 21).is_empty());
        assert!(metadata.find_range_for_verse(7, 1).is_empty());
    }

    #[test]
    fn test_first_matching_range_wins() {
        let metadata = ThemeMetadata::from_json_str(SAMPLE).unwrap();

        // 4 and 5 sit in both "1-5" and "4-8"; stored order decides
        assert_eq!(metadata.find_range_for_verse(2, 4), ["forest"]);
        assert_eq!(metadata.find_range_bounds_for_verse(2, 5), Some((1, 5)));
        assert_eq!(metadata.find_range_bounds_for_verse(2, 6), Some((4, 8)));
        assert_eq!(metadata.find_range_bounds_for_verse(2, 9), None);
    }

    #[test]
    fn test_non_range_keys_are_skipped() {
        let metadata = ThemeMetadata::from_json_str(SAMPLE).unwrap();
        assert_eq!(metadata.ranges(2).len(), 2);
    }

    #[test]
    fn test_ranges_without_themes_are_unmatched() {
        let metadata =
            ThemeMetadata::from_json_str(r#"{"1": {"1-5": ["ocean"], "6-10": [], "8-12": ["rain"]}}"#)
                .unwrap();

        assert_eq!(metadata.ranges(1).len(), 2);
        assert!(metadata.find_range_for_verse(1, 6).is_empty());
        assert_eq!(metadata.find_range_bounds_for_verse(1, 7), None);
        // An overlapping range with themes still matches
        assert_eq!(metadata.find_range_bounds_for_verse(1, 9), Some((8, 12)));
        assert_eq!(metadata.themes_for_verses(1, 1, 10), vec!["ocean", "rain"]);
    }

    #[test]
    fn test_themes_for_verses() {
        let metadata = ThemeMetadata::from_json_str(SAMPLE).unwrap();

        assert_eq!(
            metadata.themes_for_verses(19, 14, 17),
            vec!["desert", "mountain", "ocean"]
        );
        assert_eq!(metadata.themes_for_verses(19, 16, 18), vec!["ocean"]);
        assert!(metadata.themes_for_verses(19, 30, 40).is_empty());
        assert!(metadata.themes_for_verses(19, 15, 10).is_empty());
    }

    #[test]
    fn test_format_errors() {
        assert!(matches!(
            ThemeMetadata::from_json_str("not json"),
            Err(BackdropError::Format(_))
        ));
        assert!(matches!(
            ThemeMetadata::from_json_str(r#"{"x": {"1-2": ["a"]}}"#),
            Err(BackdropError::Format(_))
        ));
        assert!(matches!(
            ThemeMetadata::from_json_str(r#"{"1": {"a-2": ["a"]}}"#),
            Err(BackdropError::Format(_))
        ));
        assert!(matches!(
            ThemeMetadata::from_json_str(r#"{"1": {"1-2": "a"}}"#),
            Err(BackdropError::Format(_))
        ));
        assert!(matches!(
            ThemeMetadata::from_json_str("[1, 2]"),
            Err(BackdropError::Format(_))
        ));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = ThemeMetadata::load("/nonexistent/theme_metadata.json").await;
        assert!(matches!(result, Err(BackdropError::NotFound(_))));
    }
}
