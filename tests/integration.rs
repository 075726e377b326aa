use std::fs;
use std::time::{Duration, Instant};

use lectern::config::ConfigFile;
use lectern::controller::{ScrollStateController, ViewUpdate, ViewportMetrics, compute_progress};
use lectern::device::DeviceClass;
use lectern::document::{Article, ArticleLayout};

const VIEWPORT_ROWS: f64 = 24.0;

fn load_fixture() -> Article {
    let markdown = fs::read_to_string("tests/fixtures/long_article.md")
        .expect("fixture should exist");
    Article::parse(&markdown)
}

fn fixture_layout() -> ArticleLayout {
    load_fixture().layout(60)
}

fn metrics(layout: &ArticleLayout, offset: f64) -> ViewportMetrics {
    ViewportMetrics {
        scroll_offset: offset,
        viewport_height: VIEWPORT_ROWS,
        document_height: layout.height() as f64,
    }
}

fn full_controller() -> ScrollStateController {
    let cfg: ConfigFile = toml::from_str("").expect("empty config should parse");
    let config = cfg.resolve(DeviceClass::Full);
    ScrollStateController::new(config.viewer.profile())
}

#[test]
fn test_fixture_produces_ordered_sections() {
    let layout = fixture_layout();
    let ids: Vec<&str> = layout.toc.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "the-care-and-feeding-of-terminal-emulators",
            "a-short-history",
            "escape-sequences",
            "raw-mode-and-cooked-mode",
            "modern-extensions",
            "practical-advice",
        ]
    );
    // Sections tile the document: each starts where the previous ends
    for pair in layout.sections.windows(2) {
        assert_eq!(pair[0].top_offset + pair[0].height, pair[1].top_offset);
    }
    assert!(
        layout.height() as f64 > VIEWPORT_ROWS * 2.0,
        "fixture should be much taller than the viewport"
    );
}

#[test]
fn test_reading_session_walks_sections_in_order() {
    let layout = fixture_layout();
    let mut ctl = full_controller();
    let max = layout.max_scroll(VIEWPORT_ROWS as usize);

    let mut visited: Vec<String> = Vec::new();
    for offset in 0..=max {
        for update in ctl.refresh(&metrics(&layout, offset as f64), &layout.sections) {
            if let ViewUpdate::ActiveSection(Some(id)) = update {
                if visited.last() != Some(&id) {
                    visited.push(id);
                }
            }
        }
    }

    assert!(
        visited.len() >= 3,
        "scrolling the whole article should visit several sections, got {visited:?}"
    );
    // Document order, no revisits
    let toc_index = |id: &str| {
        layout
            .toc
            .iter()
            .position(|e| e.id == id)
            .expect("active id should be a toc entry")
    };
    let indices: Vec<usize> = visited.iter().map(|id| toc_index(id)).collect();
    for pair in indices.windows(2) {
        assert!(pair[0] < pair[1], "sections should activate in order: {visited:?}");
    }
}

#[test]
fn test_progress_spans_zero_to_hundred() {
    let layout = fixture_layout();
    let max = layout.max_scroll(VIEWPORT_ROWS as usize) as f64;
    assert_eq!(compute_progress(&metrics(&layout, 0.0)), 0.0);
    assert_eq!(compute_progress(&metrics(&layout, max)), 100.0);
    let mid = compute_progress(&metrics(&layout, max / 2.0));
    assert!((mid - 50.0).abs() < 1.0);
}

#[test]
fn test_anchor_jump_activates_target_section() {
    let layout = fixture_layout();
    let mut ctl = full_controller();
    let m = metrics(&layout, 0.0);

    let target = ctl
        .scroll_to_anchor(&layout.sections, "modern-extensions", &m)
        .expect("fixture section should resolve");
    let section = layout
        .sections
        .iter()
        .find(|s| s.id == "modern-extensions")
        .expect("section should exist");
    // Header rows and margin keep the heading below the pinned chrome
    assert!(target < section.top_offset);
    assert!(target >= 0.0);

    let updates = ctl.refresh(&metrics(&layout, target), &layout.sections);
    assert!(
        updates.contains(&ViewUpdate::ActiveSection(Some("modern-extensions".into()))),
        "landing on the anchor should highlight its section, got {updates:?}"
    );
}

#[test]
fn test_unknown_anchor_is_silent() {
    let layout = fixture_layout();
    let ctl = full_controller();
    let m = metrics(&layout, 10.0);
    assert_eq!(ctl.scroll_to_anchor(&layout.sections, "no-such-anchor", &m), None);
}

#[test]
fn test_scroll_burst_is_throttled_end_to_end() {
    let layout = fixture_layout();
    let mut ctl = full_controller();
    let t0 = Instant::now();

    let first = ctl.on_scroll(&metrics(&layout, 5.0), &layout.sections, t0);
    assert!(
        first.iter().any(|u| matches!(u, ViewUpdate::Progress(_))),
        "leading edge should emit progress"
    );

    // 5ms later: inside every throttle window (Full class floor is 16ms)
    let second = ctl.on_scroll(
        &metrics(&layout, 6.0),
        &layout.sections,
        t0 + Duration::from_millis(5),
    );
    assert!(second.is_empty(), "burst should be dropped, got {second:?}");
}

#[test]
fn test_back_to_top_hint_follows_scroll() {
    let layout = fixture_layout();
    let mut ctl = full_controller();
    let t0 = Instant::now();
    let max = layout.max_scroll(VIEWPORT_ROWS as usize) as f64;

    // Full-class threshold is 20 rows
    let down = ctl.on_scroll(&metrics(&layout, max), &layout.sections, t0);
    assert!(down.contains(&ViewUpdate::BackToTop(true)));

    let up = ctl.on_scroll(
        &metrics(&layout, 0.0),
        &layout.sections,
        t0 + Duration::from_secs(1),
    );
    assert!(up.contains(&ViewUpdate::BackToTop(false)));

    // Unchanged state does not re-emit
    let again = ctl.on_scroll(
        &metrics(&layout, 1.0),
        &layout.sections,
        t0 + Duration::from_secs(2),
    );
    assert!(!again.iter().any(|u| matches!(u, ViewUpdate::BackToTop(_))));
}

#[test]
fn test_resize_storm_settles_once() {
    let layout = fixture_layout();
    let mut ctl = full_controller();
    let t0 = Instant::now();
    let m = metrics(&layout, 30.0);

    for i in 0..10 {
        ctl.on_resize(t0 + Duration::from_millis(i * 20));
    }
    // 180ms + 250ms debounce = 430ms; before that, nothing
    assert!(ctl.poll(&m, &layout.sections, t0 + Duration::from_millis(400)).is_empty());
    let settled = ctl.poll(&m, &layout.sections, t0 + Duration::from_millis(450));
    assert!(settled.iter().any(|u| matches!(u, ViewUpdate::Progress(_))));
    assert!(ctl.poll(&m, &layout.sections, t0 + Duration::from_secs(5)).is_empty());
}

#[test]
fn test_relayout_keeps_anchors_stable() {
    let article = load_fixture();
    let wide = article.layout(100);
    let narrow = article.layout(40);
    let ctl = full_controller();

    for entry in &wide.toc {
        let m = ViewportMetrics {
            scroll_offset: 0.0,
            viewport_height: VIEWPORT_ROWS,
            document_height: narrow.height() as f64,
        };
        assert!(
            ctl.scroll_to_anchor(&narrow.sections, &entry.id, &m).is_some(),
            "anchor {} should survive relayout",
            entry.id
        );
    }
}

#[test]
fn test_disposed_controller_stays_inert() {
    let layout = fixture_layout();
    let mut ctl = full_controller();
    let t0 = Instant::now();

    ctl.on_resize(t0);
    ctl.dispose();
    assert!(ctl.is_disposed());
    assert!(ctl.on_scroll(&metrics(&layout, 50.0), &layout.sections, t0).is_empty());
    assert!(ctl.poll(&metrics(&layout, 50.0), &layout.sections, t0 + Duration::from_secs(1)).is_empty());
    assert!(ctl.refresh(&metrics(&layout, 50.0), &layout.sections).is_empty());
}
