//! Interactive article viewer.
//!
//! Single-threaded, event-driven: every mutation happens in response to a
//! discrete event (key, mouse wheel, resize, file change, timer). The
//! scroll-state controller owns progress / back-to-top / section-highlight
//! decisions; this module owns the event loop, the smooth-scroll animation
//! and the mapping from [`ViewUpdate`]s to screen regions.

mod input;
mod screen;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, MouseEventKind};
use log::{debug, info, warn};

use crate::config::Config;
use crate::controller::{ScrollStateController, Section, ViewUpdate, ViewportMetrics};
use crate::document::{Article, ArticleLayout};
use crate::rate_limit::Debounce;
use crate::theme::{Theme, ThemeStore};
use crate::watch::ArticleWatcher;

use input::{Action, InputAccumulator, map_key_event};
use screen::{RawGuard, ScreenLayout, StatusLine};

/// Per-frame fraction of the remaining scroll distance covered by the
/// smooth-scroll animation.
const SCROLL_EASE: f64 = 0.35;
/// Snap distance: below this the animation settles on the target.
const SCROLL_SNAP: f64 = 0.5;
/// Idle poll timeout; bounds watcher latency while nothing moves.
const IDLE_POLL: Duration = Duration::from_millis(120);

/// Run the viewer on an article file.
pub fn run(md_path: PathBuf, config: Config, theme: Theme, store: ThemeStore) -> Result<()> {
    screen::check_tty()?;

    let name = md_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("article")
        .to_string();

    let markdown = std::fs::read_to_string(&md_path)
        .with_context(|| format!("failed to read {}", md_path.display()))?;
    let article = Article::parse(&markdown);
    if article.is_empty() {
        anyhow::bail!("input file is empty or contains only whitespace");
    }

    let (term_cols, term_rows) =
        crossterm::terminal::size().context("failed to get terminal size")?;

    // Fire-and-forget: a dead watcher just means no live reload
    let watcher = if config.viewer.watch {
        ArticleWatcher::register(&md_path)
    } else {
        None
    };

    let mut guard = RawGuard::enter()?;
    let result = event_loop(Session {
        md_path: &md_path,
        name: &name,
        article,
        config: &config,
        theme,
        store: &store,
        watcher: watcher.as_ref(),
        term_cols,
        term_rows,
    });
    guard.cleanup();
    result
}

struct Session<'a> {
    md_path: &'a Path,
    name: &'a str,
    article: Article,
    config: &'a Config,
    theme: Theme,
    store: &'a ThemeStore,
    watcher: Option<&'a ArticleWatcher>,
    term_cols: u16,
    term_rows: u16,
}

/// Everything that must be rebuilt when geometry or content changes.
struct ViewModel {
    screen: ScreenLayout,
    layout: ArticleLayout,
    title: String,
}

impl ViewModel {
    fn build(article: &Article, name: &str, term_cols: u16, term_rows: u16, toc_cols: u16) -> Self {
        let screen = screen::compute_layout(term_cols, term_rows, toc_cols);
        let layout = article.layout(screen.content_cols as usize);
        let title = article.title().unwrap_or(name).to_string();
        Self {
            screen,
            layout,
            title,
        }
    }

    fn metrics(&self, offset: f64) -> ViewportMetrics {
        ViewportMetrics {
            scroll_offset: offset,
            viewport_height: f64::from(self.screen.content_rows),
            document_height: self.layout.height() as f64,
        }
    }

    fn sections(&self) -> &[Section] {
        &self.layout.sections
    }

    fn max_scroll(&self) -> usize {
        self.layout.max_scroll(self.screen.content_rows as usize)
    }
}

/// View state the screen draws from; mutated only via [`ViewUpdate`]s and
/// direct input feedback (prefix digits, flash messages).
struct ViewState {
    progress_pct: f64,
    active_id: Option<String>,
    top_visible: bool,
    toc_scroll: usize,
    flash: Option<String>,
}

fn event_loop(session: Session<'_>) -> Result<()> {
    let Session {
        md_path,
        name,
        mut article,
        config,
        mut theme,
        store,
        watcher,
        term_cols,
        mut term_rows,
    } = session;

    let viewer = &config.viewer;
    let mut vm = ViewModel::build(&article, name, term_cols, term_rows, viewer.toc_cols);
    let mut controller = ScrollStateController::new(viewer.profile());
    let mut reload_settle = Debounce::new(viewer.reload_debounce);

    // Scroll position: target set by input, animated position drawn
    let mut target: f64 = 0.0;
    let mut anim: f64 = 0.0;

    let mut view = ViewState {
        progress_pct: 0.0,
        active_id: None,
        top_visible: false,
        toc_scroll: 0,
        flash: None,
    };
    let mut acc = InputAccumulator::new();

    screen::clear_screen()?;
    let initial = controller.refresh(&vm.metrics(anim), vm.sections());
    apply_updates(initial, &vm, &mut view);
    draw_all(&vm, theme, &view, anim, name, acc.peek())?;
    let mut drawn_offset = row_of(anim);

    info!(
        "viewer: started, {} rows, {} sections",
        vm.layout.height(),
        vm.sections().len()
    );

    loop {
        let animating = (target - anim).abs() > f64::EPSILON;
        let timeout = if animating || reload_settle.pending() {
            viewer.frame_budget
        } else {
            IDLE_POLL
        };
        let polled = event::poll(timeout)?;
        let now = Instant::now();

        if polled {
            let ev = event::read()?;
            let had_flash = view.flash.take().is_some();
            let max = vm.max_scroll() as f64;
            let step = f64::from(viewer.scroll_step);
            let half_page = (f64::from(vm.screen.content_rows) / 2.0).max(1.0);

            match ev {
                Event::Key(key_event) => match map_key_event(key_event, &mut acc) {
                    Some(Action::Quit) => {
                        controller.dispose();
                        return Ok(());
                    }
                    Some(Action::ScrollDown(count)) => {
                        target = (target + f64::from(count) * step).min(max);
                    }
                    Some(Action::ScrollUp(count)) => {
                        target = (target - f64::from(count) * step).max(0.0);
                    }
                    Some(Action::HalfPageDown(count)) => {
                        target = (target + f64::from(count) * half_page).min(max);
                    }
                    Some(Action::HalfPageUp(count)) => {
                        target = (target - f64::from(count) * half_page).max(0.0);
                    }
                    Some(Action::JumpToTop) => {
                        target = controller.scroll_to_top();
                    }
                    Some(Action::JumpToBottom) => {
                        target = max;
                    }
                    Some(Action::JumpToSection(n)) => {
                        // 1-based TOC index; unknown targets are a silent no-op
                        if let Some(entry) = vm.layout.toc.get((n as usize).saturating_sub(1))
                            && let Some(t) = controller.scroll_to_anchor(
                                vm.sections(),
                                &entry.id,
                                &vm.metrics(anim),
                            )
                        {
                            debug!("viewer: jump to section {n} ({}) at row {t}", entry.id);
                            target = t.min(max);
                        }
                    }
                    Some(Action::SectionPrompt) => {
                        view.flash = Some("Type Ns to jump to section N".into());
                    }
                    Some(Action::ToggleTheme) => {
                        theme = theme.toggle();
                        if let Err(e) = store.save(theme) {
                            warn!("theme: failed to persist preference: {e:#}");
                        }
                        draw_all(&vm, theme, &view, anim, name, acc.peek())?;
                    }
                    Some(Action::Digit | Action::CancelInput) => {}
                    None => acc.reset(),
                },

                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollDown => target = (target + step).min(max),
                    MouseEventKind::ScrollUp => target = (target - step).max(0.0),
                    _ => {}
                },

                Event::Resize(new_cols, new_rows) => {
                    debug!("viewer: resize to {new_cols}x{new_rows}");
                    term_rows = new_rows;
                    vm = ViewModel::build(&article, name, new_cols, new_rows, viewer.toc_cols);
                    let max = vm.max_scroll() as f64;
                    target = target.min(max);
                    anim = anim.min(max);
                    drawn_offset = row_of(anim);
                    // Progress/visibility re-evaluation settles via debounce
                    controller.on_resize(now);
                    screen::clear_screen()?;
                    draw_all(&vm, theme, &view, anim, name, acc.peek())?;
                }

                _ => {}
            }

            // Status bar reflects accumulator/flash changes immediately
            if had_flash || acc.is_active() || view.flash.is_some() {
                draw_status(&vm, name, anim, &view, acc.peek(), theme)?;
            }
        }

        if watcher.is_some_and(|w| w.has_changed()) {
            reload_settle.trigger(now);
        }
        if reload_settle.poll(now) {
            match reload_article(md_path) {
                Ok(new_article) => {
                    article = new_article;
                    vm = ViewModel::build(&article, name, vm.screen.cols, term_rows, viewer.toc_cols);
                    let max = vm.max_scroll() as f64;
                    target = target.min(max);
                    anim = anim.min(max);
                    drawn_offset = row_of(anim);
                    view.flash = Some("reloaded".into());
                    screen::clear_screen()?;
                    let updates = controller.refresh(&vm.metrics(anim), vm.sections());
                    apply_updates(updates, &vm, &mut view);
                    draw_all(&vm, theme, &view, anim, name, acc.peek())?;
                }
                Err(e) => {
                    // Keep showing the last good article
                    warn!("viewer: reload failed: {e:#}");
                    view.flash = Some("reload failed (see log)".into());
                    draw_status(&vm, name, anim, &view, acc.peek(), theme)?;
                }
            }
        }

        // Smooth scroll: exponential ease toward the target, or an instant
        // jump when reduced motion is requested
        if (target - anim).abs() > f64::EPSILON {
            if viewer.reduced_motion {
                anim = target;
            } else {
                anim += (target - anim) * SCROLL_EASE;
                if (target - anim).abs() < SCROLL_SNAP {
                    anim = target;
                }
            }
        }

        let offset = row_of(anim);
        let mut updates = Vec::new();
        if offset != drawn_offset {
            updates.extend(controller.on_scroll(&vm.metrics(anim), vm.sections(), now));
        }
        updates.extend(controller.poll(&vm.metrics(anim), vm.sections(), now));

        let toc_was = (view.active_id.clone(), view.toc_scroll);
        let had_updates = !updates.is_empty();
        apply_updates(updates, &vm, &mut view);

        if offset != drawn_offset {
            screen::draw_content(&vm.screen, &vm.layout.lines, offset, &theme.palette())?;
            drawn_offset = offset;
            draw_status(&vm, name, anim, &view, acc.peek(), theme)?;
        }
        if had_updates {
            screen::draw_progress(&vm.screen, view.progress_pct, &theme.palette())?;
            if (view.active_id.clone(), view.toc_scroll) != toc_was {
                screen::draw_toc(
                    &vm.screen,
                    &vm.layout.toc,
                    view.active_id.as_deref(),
                    view.toc_scroll,
                    &theme.palette(),
                )?;
            }
            draw_status(&vm, name, anim, &view, acc.peek(), theme)?;
        }
    }
}

fn row_of(anim: f64) -> usize {
    anim.round().max(0.0) as usize
}

fn reload_article(md_path: &Path) -> Result<Article> {
    let markdown = std::fs::read_to_string(md_path)
        .with_context(|| format!("failed to read {}", md_path.display()))?;
    let article = Article::parse(&markdown);
    if article.is_empty() {
        anyhow::bail!("article became empty");
    }
    Ok(article)
}

/// Fold controller updates into the screen-owned view state.
fn apply_updates(updates: Vec<ViewUpdate>, vm: &ViewModel, view: &mut ViewState) {
    for update in updates {
        match update {
            ViewUpdate::Progress(pct) => view.progress_pct = pct,
            ViewUpdate::BackToTop(visible) => view.top_visible = visible,
            ViewUpdate::ActiveSection(id) => view.active_id = id,
            ViewUpdate::TocScrollTo(id) => {
                if let Some(idx) = vm.layout.toc.iter().position(|e| e.id == id) {
                    view.toc_scroll = screen::nearest_scroll(
                        idx,
                        view.toc_scroll,
                        vm.screen.content_rows as usize,
                    );
                }
            }
        }
    }
}

fn draw_all(
    vm: &ViewModel,
    theme: Theme,
    view: &ViewState,
    anim: f64,
    name: &str,
    acc_peek: Option<u32>,
) -> Result<()> {
    let palette = theme.palette();
    screen::draw_progress(&vm.screen, view.progress_pct, &palette)?;
    screen::draw_header(&vm.screen, &vm.title, theme.name(), &palette)?;
    screen::draw_toc(
        &vm.screen,
        &vm.layout.toc,
        view.active_id.as_deref(),
        view.toc_scroll,
        &palette,
    )?;
    screen::draw_content(&vm.screen, &vm.layout.lines, row_of(anim), &palette)?;
    screen::draw_status_bar(
        &vm.screen,
        &StatusLine {
            name,
            offset: row_of(anim),
            height: vm.layout.height(),
            pct: view.progress_pct,
            show_top_hint: view.top_visible,
            acc_peek,
            flash: view.flash.as_deref(),
        },
        &palette,
    )?;
    Ok(())
}

fn draw_status(
    vm: &ViewModel,
    name: &str,
    anim: f64,
    view: &ViewState,
    acc_peek: Option<u32>,
    theme: Theme,
) -> Result<()> {
    screen::draw_status_bar(
        &vm.screen,
        &StatusLine {
            name,
            offset: row_of(anim),
            height: vm.layout.height(),
            pct: view.progress_pct,
            show_top_hint: view.top_visible,
            acc_peek,
            flash: view.flash.as_deref(),
        },
        &theme.palette(),
    )?;
    Ok(())
}
