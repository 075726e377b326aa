//! Terminal I/O layer: raw mode, screen regions, styled drawing.
//!
//! Screen layout:
//!   row 0               : reading progress bar
//!   row 1               : header (title + theme indicator)
//!   rows 2..rows-1      : TOC pane (left) + content pane
//!   row rows-1          : status bar
//!
//! Every draw function is a full overwrite of its region; applying the same
//! view state twice is harmless.

use crossterm::{
    ExecutableCommand, QueueableCommand, cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    style::{self, Stylize},
    terminal,
};
use std::io::{self, Write, stdout};

use crate::document::{Line, LineKind, TocEntry};
use crate::theme::Palette;

// ---------------------------------------------------------------------------
// RawGuard — Drop restores raw mode / alternate screen / mouse capture
// ---------------------------------------------------------------------------

pub(super) struct RawGuard {
    cleaned: bool,
}

impl RawGuard {
    pub(super) fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        stdout().execute(terminal::EnterAlternateScreen)?;
        stdout().execute(EnableMouseCapture)?;
        stdout().execute(cursor::Hide)?;
        Ok(Self { cleaned: false })
    }

    pub(super) fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        let mut out = stdout();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(DisableMouseCapture);
        let _ = out.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Drop for RawGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

pub(super) struct ScreenLayout {
    pub cols: u16,
    pub toc_cols: u16,    // 0 = TOC pane hidden
    pub content_col: u16, // first column of the content pane
    pub content_cols: u16,
    pub content_rows: u16, // rows available for article text
    pub status_row: u16,
}

/// Rows reserved above the content pane (progress bar + header).
pub(super) const HEADER_ROWS: u16 = 2;

pub(super) fn compute_layout(term_cols: u16, term_rows: u16, toc_cols: u16) -> ScreenLayout {
    // Hide the TOC pane rather than squeezing content below a readable width
    let toc_cols = if term_cols < toc_cols.saturating_mul(3) {
        0
    } else {
        toc_cols
    };
    let content_col = if toc_cols > 0 { toc_cols + 1 } else { 0 };
    ScreenLayout {
        cols: term_cols,
        toc_cols,
        content_col,
        content_cols: term_cols.saturating_sub(content_col),
        content_rows: term_rows.saturating_sub(HEADER_ROWS + 1).max(1),
        status_row: term_rows.saturating_sub(1),
    }
}

// ---------------------------------------------------------------------------
// TOC pane scrolling (nearest alignment)
// ---------------------------------------------------------------------------

/// Minimal scroll adjustment that brings `entry_idx` into a window of
/// `visible_rows` starting at `scroll`. Entries already visible leave the
/// window untouched — the pane never recenters under the reader.
pub(super) fn nearest_scroll(entry_idx: usize, scroll: usize, visible_rows: usize) -> usize {
    let visible_rows = visible_rows.max(1);
    if entry_idx < scroll {
        entry_idx
    } else if entry_idx >= scroll + visible_rows {
        entry_idx + 1 - visible_rows
    } else {
        scroll
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// Progress bar on row 0, filled proportionally to `pct` of the full width.
pub(super) fn draw_progress(layout: &ScreenLayout, pct: f64, palette: &Palette) -> io::Result<()> {
    let mut out = stdout();
    out.queue(cursor::MoveTo(0, 0))?;
    let total = layout.cols as usize;
    let filled = ((pct / 100.0) * total as f64).round() as usize;
    let filled = filled.min(total);
    let bar_fill: String = "█".repeat(filled);
    let bar_rest: String = "─".repeat(total - filled);
    write!(out, "{}", bar_fill.with(palette.bar_fill))?;
    write!(out, "{}", bar_rest.with(palette.bar_empty))?;
    out.flush()
}

/// Header row: article title left, theme indicator right.
pub(super) fn draw_header(
    layout: &ScreenLayout,
    title: &str,
    theme_name: &str,
    palette: &Palette,
) -> io::Result<()> {
    let mut out = stdout();
    out.queue(cursor::MoveTo(0, 1))?;
    let tag = format!("[{theme_name}]");
    let avail = (layout.cols as usize).saturating_sub(tag.len() + 1);
    let title = truncate(title, avail);
    let line = format!("{title:<avail$} {tag}");
    write!(out, "{}", truncate(&line, layout.cols as usize).with(palette.accent).bold())?;
    out.flush()
}

/// TOC pane: numbered entries, the active one highlighted.
pub(super) fn draw_toc(
    layout: &ScreenLayout,
    toc: &[TocEntry],
    active_id: Option<&str>,
    toc_scroll: usize,
    palette: &Palette,
) -> io::Result<()> {
    if layout.toc_cols == 0 {
        return Ok(());
    }
    let mut out = stdout();
    let width = layout.toc_cols as usize;
    let rows = layout.content_rows as usize;
    for row in 0..rows {
        out.queue(cursor::MoveTo(0, HEADER_ROWS + row as u16))?;
        match toc.get(toc_scroll + row) {
            Some(entry) => {
                let indent = "  ".repeat(entry.level.saturating_sub(1).min(3) as usize);
                let label = format!("{}{} {}", indent, toc_scroll + row + 1, entry.title);
                let label = format!("{:<width$}", truncate(&label, width));
                if Some(entry.id.as_str()) == active_id {
                    write!(out, "{}", label.with(palette.accent).bold().reverse())?;
                } else {
                    write!(out, "{}", label.with(palette.dim))?;
                }
            }
            None => {
                write!(out, "{:<width$}", "")?;
            }
        }
        // Pane separator
        write!(out, "{}", "│".with(palette.dim))?;
    }
    out.flush()
}

/// Content pane: the visible window of laid-out article lines.
pub(super) fn draw_content(
    layout: &ScreenLayout,
    lines: &[Line],
    scroll_offset: usize,
    palette: &Palette,
) -> io::Result<()> {
    let mut out = stdout();
    let width = layout.content_cols as usize;
    for row in 0..layout.content_rows {
        out.queue(cursor::MoveTo(layout.content_col, HEADER_ROWS + row))?;
        let text = match lines.get(scroll_offset + row as usize) {
            Some(line) => {
                let padded = format!("{:<width$}", truncate(&line.text, width));
                match line.kind {
                    LineKind::Heading(1) => padded.with(palette.accent).bold(),
                    LineKind::Heading(_) => padded.with(palette.accent),
                    LineKind::Code => padded.with(palette.dim),
                    LineKind::Quote => padded.with(palette.dim).italic(),
                    LineKind::Rule => padded.with(palette.dim),
                    _ => padded.with(palette.fg),
                }
            }
            None => format!("{:<width$}", "").with(palette.fg),
        };
        write!(out, "{text}")?;
    }
    out.queue(style::ResetColor)?;
    out.flush()
}

/// Everything the status bar shows for one frame.
pub(super) struct StatusLine<'a> {
    pub name: &'a str,
    pub offset: usize,
    pub height: usize,
    pub pct: f64,
    /// The back-to-top affordance.
    pub show_top_hint: bool,
    /// Digits accumulated for a prefix command, shown as `:3_`.
    pub acc_peek: Option<u32>,
    /// Transient message (section prompt, reload notice), cleared on the
    /// next keypress.
    pub flash: Option<&'a str>,
}

/// Status bar on the last row.
pub(super) fn draw_status_bar(
    layout: &ScreenLayout,
    status: &StatusLine,
    palette: &Palette,
) -> io::Result<()> {
    let mut out = stdout();
    out.queue(cursor::MoveTo(0, layout.status_row))?;

    let StatusLine {
        name,
        offset,
        height,
        pct,
        show_top_hint,
        acc_peek,
        flash,
    } = *status;
    let hint = if show_top_hint { "  ⇧ top (g)" } else { "" };
    let middle = if let Some(msg) = flash {
        format!(" {name} | {msg} | {offset}/{height} rows  {pct:.0}%{hint}")
    } else if let Some(n) = acc_peek {
        format!(" {name} | :{n}_ | {offset}/{height} rows  {pct:.0}%{hint}")
    } else {
        format!(
            " {name} | {offset}/{height} rows  {pct:.0}%{hint}  [j/k d/u Ns:section g:top t:theme q:quit]"
        )
    };

    let padded = format!(
        "{:<width$}",
        truncate(&middle, layout.cols as usize),
        width = layout.cols as usize
    );
    write!(
        out,
        "{}",
        padded.with(palette.status_fg).on(palette.status_bg)
    )?;
    out.queue(style::ResetColor)?;
    out.flush()
}

pub(super) fn clear_screen() -> io::Result<()> {
    let mut out = stdout();
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    out.flush()
}

pub(super) fn check_tty() -> anyhow::Result<()> {
    use std::io::IsTerminal;
    // Only stdout matters. crossterm's `use-dev-tty` reads keyboard from
    // /dev/tty (Unix) or Console API (Windows), so stdin being a pipe is fine.
    if !io::stdout().is_terminal() {
        anyhow::bail!(
            "lectern viewer requires an interactive terminal.\n\
             \n\
             To inspect an article without one, use: lectern toc <input.md>"
        );
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        text.chars().take(width.saturating_sub(1)).collect::<String>() + "…"
    }
}
