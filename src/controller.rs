//! Scroll-driven UI state controller.
//!
//! Owns reading-progress computation, back-to-top visibility and
//! active-section detection for the viewer. Geometry is passed in fresh on
//! every call ([`ViewportMetrics`] is a snapshot, never cached — it can change
//! between frames), and the controller emits [`ViewUpdate`]s that the screen
//! layer applies. All state lives in one constructed object: the three event
//! handlers are gated by independent rate limiters whose timer state never
//! interferes.

use std::time::{Duration, Instant};

use log::debug;

use crate::rate_limit::{Debounce, Throttle};

// ---------------------------------------------------------------------------
// Geometry snapshots
// ---------------------------------------------------------------------------

/// Viewport geometry, queried from the live layout on demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    /// Vertical scroll offset in rows.
    pub scroll_offset: f64,
    /// Visible content height in rows.
    pub viewport_height: f64,
    /// Total laid-out document height in rows.
    pub document_height: f64,
}

/// Read-only position snapshot of one article section.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub top_offset: f64,
    pub height: f64,
}

// ---------------------------------------------------------------------------
// Pure computations
// ---------------------------------------------------------------------------

/// Reading progress in percent, clamped to [0, 100].
///
/// A document no taller than the viewport has no scrollable range; the
/// degenerate denominator resolves to 0 rather than NaN/Infinity.
pub fn compute_progress(metrics: &ViewportMetrics) -> f64 {
    let scrollable = metrics.document_height - metrics.viewport_height;
    if scrollable <= 0.0 {
        return 0.0;
    }
    (metrics.scroll_offset / scrollable * 100.0).clamp(0.0, 100.0)
}

/// Whether the back-to-top affordance should show. Strict `>`: an offset
/// exactly at the threshold stays hidden, so the boundary cannot oscillate.
pub fn back_to_top_visible(scroll_offset: f64, threshold: f64) -> bool {
    scroll_offset > threshold
}

/// Find the active section for the current scroll position.
///
/// The trigger line sits `viewport_height * activation_ratio` below the top
/// of the viewport; a section matches when the trigger line falls inside
/// `[top, top + height)`. Sections are scanned in document order and the
/// last match wins, so with overlapping sections the result is
/// order-dependent, not geometry-optimal.
pub fn determine_active_section<'a>(
    sections: &'a [Section],
    scroll_offset: f64,
    viewport_height: f64,
    activation_ratio: f64,
) -> Option<&'a str> {
    let trigger = scroll_offset + viewport_height * activation_ratio;
    let mut current = None;
    for section in sections {
        if trigger >= section.top_offset && trigger < section.top_offset + section.height {
            current = Some(section.id.as_str());
        }
    }
    current
}

// ---------------------------------------------------------------------------
// ControllerProfile — per-device-class configuration
// ---------------------------------------------------------------------------

/// Rate limits and thresholds for one device class, selected once at
/// construction time instead of duplicating handler logic per class.
#[derive(Debug, Clone)]
pub struct ControllerProfile {
    pub progress_throttle: Duration,
    pub visibility_throttle: Duration,
    pub highlight_throttle: Duration,
    pub resize_debounce: Duration,
    /// Rows scrolled before the back-to-top affordance shows.
    pub visibility_threshold: f64,
    /// Fraction of viewport height added to the offset for the trigger line.
    pub section_activation_ratio: f64,
    /// Rows reserved above an anchor target (sticky header equivalent).
    pub header_height: f64,
    /// Extra breathing room above an anchor target.
    pub anchor_margin: f64,
    pub toc_autoscroll: bool,
    pub reduced_motion: bool,
}

// ---------------------------------------------------------------------------
// ScrollStateController
// ---------------------------------------------------------------------------

/// View mutation requested by the controller. Applying these is idempotent;
/// the screen layer owns the actual drawing.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    /// Progress bar fill, percent of width.
    Progress(f64),
    /// Show or hide the back-to-top affordance.
    BackToTop(bool),
    /// Highlight this section in the TOC (None clears the highlight).
    ActiveSection(Option<String>),
    /// Bring the TOC entry with this section id into view, nearest alignment.
    TocScrollTo(String),
}

pub struct ScrollStateController {
    profile: ControllerProfile,
    progress_gate: Throttle,
    visibility_gate: Throttle,
    highlight_gate: Throttle,
    resize_settle: Debounce,
    active_section: Option<String>,
    top_visible: bool,
    disposed: bool,
}

impl ScrollStateController {
    pub fn new(profile: ControllerProfile) -> Self {
        let progress_gate = Throttle::new(profile.progress_throttle);
        let visibility_gate = Throttle::new(profile.visibility_throttle);
        let highlight_gate = Throttle::new(profile.highlight_throttle);
        let resize_settle = Debounce::new(profile.resize_debounce);
        Self {
            profile,
            progress_gate,
            visibility_gate,
            highlight_gate,
            resize_settle,
            active_section: None,
            top_visible: false,
            disposed: false,
        }
    }

    pub fn profile(&self) -> &ControllerProfile {
        &self.profile
    }

    /// Currently highlighted section id, if any.
    pub fn active_section(&self) -> Option<&str> {
        self.active_section.as_deref()
    }

    /// Scroll handler: each of the three updaters runs through its own
    /// throttle, so a fast scroll stream drops intermediate evaluations
    /// per-handler without any cross-talk.
    pub fn on_scroll(
        &mut self,
        metrics: &ViewportMetrics,
        sections: &[Section],
        now: Instant,
    ) -> Vec<ViewUpdate> {
        if self.disposed {
            return Vec::new();
        }
        let mut updates = Vec::new();
        if self.progress_gate.admit(now) {
            updates.push(ViewUpdate::Progress(compute_progress(metrics)));
        }
        if self.visibility_gate.admit(now) {
            self.push_visibility(metrics, &mut updates);
        }
        if self.highlight_gate.admit(now) {
            self.push_highlight(metrics, sections, &mut updates);
        }
        updates
    }

    /// Resize handler: bursts of resize events settle through the debouncer;
    /// the actual re-evaluation happens in [`poll`](Self::poll).
    pub fn on_resize(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        self.resize_settle.trigger(now);
    }

    /// Fire the settled resize re-evaluation, if due. Call once per frame.
    pub fn poll(
        &mut self,
        metrics: &ViewportMetrics,
        sections: &[Section],
        now: Instant,
    ) -> Vec<ViewUpdate> {
        if self.disposed || !self.resize_settle.poll(now) {
            return Vec::new();
        }
        debug!("controller: resize settled, full refresh");
        self.refresh(metrics, sections)
    }

    /// Unthrottled re-evaluation of all three updaters. Used for the initial
    /// draw, after an anchor jump, and after a settled resize.
    pub fn refresh(&mut self, metrics: &ViewportMetrics, sections: &[Section]) -> Vec<ViewUpdate> {
        if self.disposed {
            return Vec::new();
        }
        let mut updates = vec![ViewUpdate::Progress(compute_progress(metrics))];
        self.push_visibility(metrics, &mut updates);
        self.push_highlight(metrics, sections, &mut updates);
        updates
    }

    /// Scroll target for a jump to the very top.
    pub fn scroll_to_top(&self) -> f64 {
        0.0
    }

    /// Scroll target for a jump to the section with the given anchor id.
    /// Unknown ids are a silent no-op (None); the target is clamped to the
    /// scrollable range.
    pub fn scroll_to_anchor(
        &self,
        sections: &[Section],
        target_id: &str,
        metrics: &ViewportMetrics,
    ) -> Option<f64> {
        let section = sections.iter().find(|s| s.id == target_id)?;
        let raw = section.top_offset - self.profile.header_height - self.profile.anchor_margin;
        let max = (metrics.document_height - metrics.viewport_height).max(0.0);
        Some(raw.clamp(0.0, max))
    }

    /// Cancel pending timers and render the controller inert. The source
    /// scripts had no teardown path; this one exists so the viewer can drop
    /// the controller without a timer firing into torn-down state.
    pub fn dispose(&mut self) {
        self.resize_settle.cancel();
        self.progress_gate.reset();
        self.visibility_gate.reset();
        self.highlight_gate.reset();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn push_visibility(&mut self, metrics: &ViewportMetrics, updates: &mut Vec<ViewUpdate>) {
        let visible = back_to_top_visible(metrics.scroll_offset, self.profile.visibility_threshold);
        if visible != self.top_visible {
            self.top_visible = visible;
            updates.push(ViewUpdate::BackToTop(visible));
        }
    }

    fn push_highlight(
        &mut self,
        metrics: &ViewportMetrics,
        sections: &[Section],
        updates: &mut Vec<ViewUpdate>,
    ) {
        let active = determine_active_section(
            sections,
            metrics.scroll_offset,
            metrics.viewport_height,
            self.profile.section_activation_ratio,
        )
        .map(str::to_owned);
        if active != self.active_section {
            debug!(
                "controller: active section {:?} -> {:?}",
                self.active_section, active
            );
            self.active_section = active.clone();
            updates.push(ViewUpdate::ActiveSection(active.clone()));
            if self.profile.toc_autoscroll {
                if let Some(id) = active {
                    updates.push(ViewUpdate::TocScrollTo(id));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(offset: f64, vp: f64, doc: f64) -> ViewportMetrics {
        ViewportMetrics {
            scroll_offset: offset,
            viewport_height: vp,
            document_height: doc,
        }
    }

    fn section(id: &str, top: f64, height: f64) -> Section {
        Section {
            id: id.to_string(),
            top_offset: top,
            height,
        }
    }

    fn test_profile() -> ControllerProfile {
        ControllerProfile {
            progress_throttle: Duration::from_millis(16),
            visibility_throttle: Duration::from_millis(100),
            highlight_throttle: Duration::from_millis(50),
            resize_debounce: Duration::from_millis(250),
            visibility_threshold: 200.0,
            section_activation_ratio: 0.3,
            header_height: 4.0,
            anchor_margin: 1.0,
            toc_autoscroll: false,
            reduced_motion: false,
        }
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(compute_progress(&metrics(0.0, 100.0, 500.0)), 0.0);
        assert_eq!(compute_progress(&metrics(400.0, 100.0, 500.0)), 100.0);
        // Overscroll (rubber-banding) still clamps
        assert_eq!(compute_progress(&metrics(900.0, 100.0, 500.0)), 100.0);
        let mid = compute_progress(&metrics(200.0, 100.0, 500.0));
        assert!((mid - 50.0).abs() < 1e-9);
    }

    #[test]
    fn progress_is_monotonic_in_offset() {
        let mut last = -1.0;
        for step in 0..=40 {
            let p = compute_progress(&metrics(step as f64 * 10.0, 100.0, 500.0));
            assert!(p >= last, "progress regressed at offset {}", step * 10);
            assert!((0.0..=100.0).contains(&p));
            last = p;
        }
    }

    #[test]
    fn progress_degenerate_document_is_zero() {
        // Content no taller than the viewport: no NaN, no Infinity, just 0
        assert_eq!(compute_progress(&metrics(0.0, 100.0, 100.0)), 0.0);
        assert_eq!(compute_progress(&metrics(50.0, 100.0, 80.0)), 0.0);
        assert_eq!(compute_progress(&metrics(0.0, 100.0, 0.0)), 0.0);
    }

    #[test]
    fn back_to_top_threshold_is_strict() {
        assert!(!back_to_top_visible(199.0, 200.0));
        assert!(!back_to_top_visible(200.0, 200.0));
        assert!(back_to_top_visible(201.0, 200.0));
    }

    #[test]
    fn active_section_basic_bands() {
        let sections = vec![
            section("a", 0.0, 100.0),
            section("b", 100.0, 100.0),
            section("c", 200.0, 100.0),
        ];
        // trigger = offset + vp * ratio; use ratio 0 and drive offset directly
        assert_eq!(
            determine_active_section(&sections, 150.0, 50.0, 0.0),
            Some("b")
        );
        // Section start is inclusive
        assert_eq!(
            determine_active_section(&sections, 100.0, 50.0, 0.0),
            Some("b")
        );
        // Past the last section: nothing active
        assert_eq!(determine_active_section(&sections, 350.0, 50.0, 0.0), None);
    }

    #[test]
    fn active_section_end_is_exclusive() {
        let sections = vec![section("a", 0.0, 100.0)];
        assert_eq!(determine_active_section(&sections, 100.0, 50.0, 0.0), None);
        assert_eq!(
            determine_active_section(&sections, 99.9, 50.0, 0.0),
            Some("a")
        );
    }

    #[test]
    fn overlapping_sections_last_match_wins() {
        let sections = vec![section("a", 0.0, 200.0), section("b", 100.0, 200.0)];
        // trigger 150 is inside both; document order [a, b] makes b win
        assert_eq!(
            determine_active_section(&sections, 150.0, 50.0, 0.0),
            Some("b")
        );
    }

    #[test]
    fn activation_ratio_shifts_trigger_line() {
        let sections = vec![section("a", 0.0, 100.0), section("b", 100.0, 100.0)];
        // offset 85 + 50 * 0.3 = 100 → lands exactly on b's start
        assert_eq!(
            determine_active_section(&sections, 85.0, 50.0, 0.3),
            Some("b")
        );
        assert_eq!(
            determine_active_section(&sections, 84.9, 50.0, 0.3),
            Some("a")
        );
    }

    #[test]
    fn anchor_target_subtracts_header_and_margin() {
        let ctl = ScrollStateController::new(test_profile());
        let sections = vec![section("intro", 50.0, 40.0)];
        let m = metrics(0.0, 30.0, 400.0);
        let target = ctl.scroll_to_anchor(&sections, "intro", &m);
        assert_eq!(target, Some(45.0)); // 50 - 4 - 1
    }

    #[test]
    fn anchor_target_clamps_to_scrollable_range() {
        let ctl = ScrollStateController::new(test_profile());
        let sections = vec![section("top", 2.0, 10.0), section("end", 395.0, 20.0)];
        let m = metrics(0.0, 30.0, 400.0);
        // Near the top: 2 - 5 would go negative
        assert_eq!(ctl.scroll_to_anchor(&sections, "top", &m), Some(0.0));
        // Near the bottom: clamped to doc - viewport
        assert_eq!(ctl.scroll_to_anchor(&sections, "end", &m), Some(370.0));
    }

    #[test]
    fn anchor_unknown_id_is_silent_noop() {
        let ctl = ScrollStateController::new(test_profile());
        let sections = vec![section("intro", 50.0, 40.0)];
        let m = metrics(12.0, 30.0, 400.0);
        assert_eq!(ctl.scroll_to_anchor(&sections, "missing", &m), None);
    }

    #[test]
    fn scroll_burst_throttles_per_handler() {
        let t0 = Instant::now();
        let mut ctl = ScrollStateController::new(test_profile());
        let sections = vec![section("a", 0.0, 500.0)];

        let first = ctl.on_scroll(&metrics(300.0, 100.0, 500.0), &sections, t0);
        // All three handlers fire on the leading edge
        assert!(first.contains(&ViewUpdate::Progress(75.0)));
        assert!(first.contains(&ViewUpdate::BackToTop(true)));
        assert!(first.contains(&ViewUpdate::ActiveSection(Some("a".into()))));

        // 20ms later: progress window (16ms) reopened, the others are closed
        let second = ctl.on_scroll(
            &metrics(310.0, 100.0, 500.0),
            &sections,
            t0 + Duration::from_millis(20),
        );
        assert_eq!(second.len(), 1);
        assert!(matches!(second[0], ViewUpdate::Progress(_)));
    }

    #[test]
    fn visibility_and_highlight_emit_only_on_change() {
        let t0 = Instant::now();
        let mut ctl = ScrollStateController::new(test_profile());
        let sections = vec![section("a", 0.0, 500.0)];
        let m = metrics(300.0, 100.0, 500.0);

        ctl.on_scroll(&m, &sections, t0);
        // Same state one window later: only the (always-emitted) progress
        let updates = ctl.on_scroll(&m, &sections, t0 + Duration::from_millis(500));
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], ViewUpdate::Progress(_)));
    }

    #[test]
    fn leaving_all_sections_clears_highlight() {
        let t0 = Instant::now();
        let mut ctl = ScrollStateController::new(test_profile());
        let sections = vec![section("a", 0.0, 100.0)];

        ctl.on_scroll(&metrics(0.0, 100.0, 500.0), &sections, t0);
        assert_eq!(ctl.active_section(), Some("a"));

        let updates = ctl.on_scroll(
            &metrics(400.0, 100.0, 500.0),
            &sections,
            t0 + Duration::from_secs(1),
        );
        assert!(updates.contains(&ViewUpdate::ActiveSection(None)));
        assert_eq!(ctl.active_section(), None);
    }

    #[test]
    fn toc_autoscroll_emits_on_activation() {
        let t0 = Instant::now();
        let mut profile = test_profile();
        profile.toc_autoscroll = true;
        let mut ctl = ScrollStateController::new(profile);
        let sections = vec![section("a", 0.0, 100.0), section("b", 100.0, 100.0)];

        let updates = ctl.on_scroll(&metrics(120.0, 100.0, 500.0), &sections, t0);
        assert!(updates.contains(&ViewUpdate::TocScrollTo("b".into())));
    }

    #[test]
    fn resize_settles_through_debounce() {
        let t0 = Instant::now();
        let mut ctl = ScrollStateController::new(test_profile());
        let sections = vec![section("a", 0.0, 500.0)];
        let m = metrics(50.0, 100.0, 500.0);

        ctl.on_resize(t0);
        ctl.on_resize(t0 + Duration::from_millis(100));
        // Quiet period not elapsed yet
        assert!(ctl.poll(&m, &sections, t0 + Duration::from_millis(300)).is_empty());
        // 250ms after the last resize: full refresh
        let updates = ctl.poll(&m, &sections, t0 + Duration::from_millis(350));
        assert!(updates.contains(&ViewUpdate::Progress(12.5)));
        // Fires once
        assert!(ctl.poll(&m, &sections, t0 + Duration::from_secs(2)).is_empty());
    }

    #[test]
    fn dispose_cancels_pending_timers() {
        let t0 = Instant::now();
        let mut ctl = ScrollStateController::new(test_profile());
        let sections = vec![section("a", 0.0, 500.0)];
        let m = metrics(50.0, 100.0, 500.0);

        ctl.on_resize(t0);
        ctl.dispose();
        assert!(ctl.is_disposed());
        assert!(ctl.poll(&m, &sections, t0 + Duration::from_secs(1)).is_empty());
        assert!(ctl.on_scroll(&m, &sections, t0 + Duration::from_secs(1)).is_empty());
    }
}
