use async_trait::async_trait;
use backdrop_core::{Collector, CollectorConfig, DurationProbe, Result, VideoSource};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use verse_backdrop::{CollectionMode, SelectionState, Selector, ThemeMetadata, VerseSpan};

const THEMES: &[&str] = &["desert", "forest", "mountain", "ocean", "rain", "night", "dawn"];

/// A 286-verse unit split into ranges of 10 verses with three themes each
fn long_unit_metadata() -> ThemeMetadata {
    let mut ranges = serde_json::Map::new();
    for (index, start) in (1..=286).step_by(10).enumerate() {
        let end = (start + 9).min(286);
        let themes: Vec<&str> = (0..3).map(|i| THEMES[(index + i) % THEMES.len()]).collect();
        ranges.insert(format!("{}-{}", start, end), serde_json::json!(themes));
    }

    let mut root = serde_json::Map::new();
    root.insert("2".to_string(), serde_json::Value::Object(ranges));
    ThemeMetadata::from_value(serde_json::Value::Object(root)).unwrap()
}

/// Every theme holds twenty 7-second clips
struct SyntheticCatalog;

#[async_trait]
impl VideoSource for SyntheticCatalog {
    async fn list_videos(&self, theme: &str) -> Result<Vec<String>> {
        Ok((0..20).map(|i| format!("{}/clip_{:02}.mp4", theme, i)).collect())
    }

    async fn download(&self, video_id: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(video_id))
    }
}

#[async_trait]
impl DurationProbe for SyntheticCatalog {
    async fn probe_duration(&self, _path: &Path) -> f64 {
        7.0
    }
}

/// Benchmark splitting a whole unit into per-range segments
fn bench_segmentation(c: &mut Criterion) {
    let selector = Selector::new(long_unit_metadata(), 99);

    c.bench_function("verse_range_segments_full_unit", |b| {
        b.iter(|| selector.verse_range_segments(black_box(VerseSpan::new(2, 1, 286))))
    });

    c.bench_function("themes_for_verses_full_unit", |b| {
        b.iter(|| selector.themes_for_verses(black_box(VerseSpan::new(2, 1, 286))))
    });
}

/// Benchmark repeated theme and video draws against one state
fn bench_selection(c: &mut Criterion) {
    let themes: Vec<String> = THEMES.iter().map(|t| t.to_string()).collect();
    let videos: Vec<String> = (0..50).map(|i| format!("clip_{:02}.mp4", i)).collect();

    c.bench_function("select_theme_and_video_x100", |b| {
        b.iter(|| {
            let mut selector = Selector::new(ThemeMetadata::default(), 99);
            let mut state = SelectionState::new();
            for _ in 0..100 {
                let theme = selector.select_theme(&themes, "2:1-286", &mut state).unwrap();
                state.mark_theme_exhausted("2:1-286", &theme);
                black_box(
                    selector
                        .select_video_from_theme(&theme, &videos, &mut state)
                        .unwrap(),
                );
            }
        })
    });
}

/// Benchmark full collection runs in both modes
fn bench_collection(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let metadata = long_unit_metadata();
    let catalog = SyntheticCatalog;

    for mode in [CollectionMode::Flat, CollectionMode::PerRange] {
        let collector = Collector::new(
            &catalog,
            &catalog,
            CollectorConfig::default().with_mode(mode),
        );
        let name = format!("collect_600s_{:?}", mode).to_lowercase();

        c.bench_function(&name, |b| {
            b.iter(|| {
                rt.block_on(async {
                    let mut selector = Selector::new(metadata.clone(), 99);
                    let mut state = SelectionState::new();
                    collector
                        .collect(
                            &mut selector,
                            &mut state,
                            black_box(VerseSpan::new(2, 1, 286)),
                            600.0,
                        )
                        .await
                        .unwrap()
                })
            })
        });
    }
}

criterion_group!(benches, bench_segmentation, bench_selection, bench_collection);
criterion_main!(benches);
