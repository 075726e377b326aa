//! Markdown article model: parsing and row-based layout.
//!
//! Parsing flattens the pulldown-cmark event stream into logical blocks;
//! layout wraps blocks to the current terminal width and records where each
//! heading-rooted section lands. Section offsets are row positions in the
//! laid-out document, re-derived on every relayout (resize, reload) — nothing
//! here survives a geometry change.

use log::debug;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::controller::Section;

// ---------------------------------------------------------------------------
// Parsed blocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Heading { level: u8, text: String, id: String },
    Paragraph(String),
    Quote(String),
    Code(Vec<String>),
    ListItem { marker: String, text: String },
    Rule,
}

/// A parsed article, independent of any terminal width.
#[derive(Debug, Clone)]
pub struct Article {
    blocks: Vec<Block>,
}

/// One table-of-contents entry, mirroring a section anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub id: String,
    pub title: String,
    pub level: u8,
}

impl Article {
    /// Parse Markdown into blocks. Inline formatting is flattened to plain
    /// text; tables and strikethrough are enabled to match common article
    /// sources but tables degrade to their cell text.
    pub fn parse(markdown: &str) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        let parser = Parser::new_ext(markdown, options);

        let mut blocks = Vec::new();
        let mut text = String::new();
        let mut code_lines: Vec<String> = Vec::new();
        let mut in_code = false;
        let mut quote_depth = 0usize;
        let mut heading_level: Option<u8> = None;
        let mut list_counters: Vec<Option<u64>> = Vec::new();
        let mut slugs = SlugSet::default();

        for event in parser {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    heading_level = Some(heading_rank(level));
                    text.clear();
                }
                Event::End(TagEnd::Heading(_)) => {
                    let title = std::mem::take(&mut text);
                    let title = title.trim().to_string();
                    let level = heading_level.take().unwrap_or(1);
                    if !title.is_empty() {
                        let id = slugs.assign(&title);
                        blocks.push(Block::Heading { level, text: title, id });
                    }
                }

                Event::Start(Tag::Paragraph) => text.clear(),
                Event::End(TagEnd::Paragraph) => {
                    let body = std::mem::take(&mut text);
                    let body = body.trim().to_string();
                    if body.is_empty() {
                        continue;
                    }
                    if !list_counters.is_empty() {
                        let marker = next_marker(&mut list_counters);
                        blocks.push(Block::ListItem { marker, text: body });
                    } else if quote_depth > 0 {
                        blocks.push(Block::Quote(body));
                    } else {
                        blocks.push(Block::Paragraph(body));
                    }
                }

                Event::Start(Tag::BlockQuote(_)) => quote_depth += 1,
                Event::End(TagEnd::BlockQuote(_)) => {
                    quote_depth = quote_depth.saturating_sub(1);
                }

                Event::Start(Tag::CodeBlock(_)) => {
                    in_code = true;
                    code_lines.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code = false;
                    blocks.push(Block::Code(std::mem::take(&mut code_lines)));
                }

                Event::Start(Tag::List(start)) => list_counters.push(start),
                Event::End(TagEnd::List(_)) => {
                    list_counters.pop();
                }
                Event::Start(Tag::Item) => text.clear(),
                Event::End(TagEnd::Item) => {
                    // Loose items end via TagEnd::Paragraph above; tight items
                    // still carry their text here.
                    let body = std::mem::take(&mut text);
                    let body = body.trim().to_string();
                    if !body.is_empty() {
                        let marker = next_marker(&mut list_counters);
                        blocks.push(Block::ListItem { marker, text: body });
                    }
                }

                Event::Rule => blocks.push(Block::Rule),

                Event::Text(t) | Event::Code(t) => {
                    if in_code {
                        for line in t.lines() {
                            code_lines.push(line.to_string());
                        }
                        if t.is_empty() {
                            code_lines.push(String::new());
                        }
                    } else {
                        text.push_str(&t);
                    }
                }
                Event::SoftBreak => text.push(' '),
                Event::HardBreak => text.push(' '),

                _ => {}
            }
        }

        debug!("document: parsed {} blocks", blocks.len());
        Self { blocks }
    }

    /// First top-level heading, used as the display title.
    pub fn title(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            Block::Heading { level: 1, text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Wrap the article to `width` columns and compute section geometry.
    pub fn layout(&self, width: usize) -> ArticleLayout {
        let width = width.max(10);
        let mut lines: Vec<Line> = Vec::new();
        let mut toc: Vec<TocEntry> = Vec::new();
        // (id, start_row) for open section bookkeeping
        let mut starts: Vec<(String, usize)> = Vec::new();

        for block in &self.blocks {
            match block {
                Block::Heading { level, text, id } => {
                    if !lines.is_empty() {
                        lines.push(Line::blank());
                    }
                    starts.push((id.clone(), lines.len()));
                    toc.push(TocEntry {
                        id: id.clone(),
                        title: text.clone(),
                        level: *level,
                    });
                    for wrapped in wrap(text, width) {
                        lines.push(Line {
                            text: wrapped,
                            kind: LineKind::Heading(*level),
                        });
                    }
                }
                Block::Paragraph(text) => {
                    push_wrapped(&mut lines, text, width, LineKind::Body, "");
                }
                Block::Quote(text) => {
                    push_wrapped(&mut lines, text, width.saturating_sub(2), LineKind::Quote, "");
                }
                Block::Code(code) => {
                    lines.push(Line::blank());
                    for code_line in code {
                        lines.push(Line {
                            text: code_line.clone(),
                            kind: LineKind::Code,
                        });
                    }
                }
                Block::ListItem { marker, text } => {
                    lines.push(Line::blank_if_needed(&lines));
                    let indent = " ".repeat(marker.len());
                    let wrapped = wrap(text, width.saturating_sub(marker.len()).max(8));
                    for (i, w) in wrapped.into_iter().enumerate() {
                        let prefix = if i == 0 { marker.clone() } else { indent.clone() };
                        lines.push(Line {
                            text: format!("{prefix}{w}"),
                            kind: LineKind::ListItem,
                        });
                    }
                }
                Block::Rule => {
                    lines.push(Line::blank());
                    lines.push(Line {
                        text: "─".repeat(width),
                        kind: LineKind::Rule,
                    });
                }
            }
        }

        // Drop helper blanks produced by blank_if_needed duplication
        lines.retain(|l| !matches!(l.kind, LineKind::Skip));

        // Each section spans from its heading to the next heading (or EOF).
        let mut sections = Vec::with_capacity(starts.len());
        for (i, (id, start)) in starts.iter().enumerate() {
            let end = starts
                .get(i + 1)
                .map(|(_, next)| *next)
                .unwrap_or(lines.len());
            sections.push(Section {
                id: id.clone(),
                top_offset: *start as f64,
                height: end.saturating_sub(*start).max(1) as f64,
            });
        }

        debug!(
            "document: laid out {} rows, {} sections at width {}",
            lines.len(),
            sections.len(),
            width
        );
        ArticleLayout { lines, sections, toc }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading(u8),
    Body,
    Quote,
    Code,
    ListItem,
    Rule,
    Blank,
    /// Internal placeholder, filtered out before the layout is returned.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub kind: LineKind,
}

impl Line {
    fn blank() -> Self {
        Self {
            text: String::new(),
            kind: LineKind::Blank,
        }
    }

    /// A blank separator, unless the previous line already is one (keeps
    /// tight lists tight).
    fn blank_if_needed(lines: &[Line]) -> Self {
        match lines.last() {
            Some(l) if matches!(l.kind, LineKind::Blank | LineKind::ListItem) => Self {
                text: String::new(),
                kind: LineKind::Skip,
            },
            _ => Self::blank(),
        }
    }
}

/// A width-specific rendering of an [`Article`].
#[derive(Debug, Clone)]
pub struct ArticleLayout {
    pub lines: Vec<Line>,
    pub sections: Vec<Section>,
    pub toc: Vec<TocEntry>,
}

impl ArticleLayout {
    pub fn height(&self) -> usize {
        self.lines.len()
    }

    /// Maximum scroll offset for a viewport of `viewport_rows`.
    pub fn max_scroll(&self, viewport_rows: usize) -> usize {
        self.lines.len().saturating_sub(viewport_rows)
    }
}

fn push_wrapped(lines: &mut Vec<Line>, text: &str, width: usize, kind: LineKind, prefix: &str) {
    lines.push(Line::blank());
    for wrapped in wrap(text, width.max(8)) {
        lines.push(Line {
            text: format!("{prefix}{wrapped}"),
            kind,
        });
    }
}

/// Greedy word wrap. Words longer than the width are hard-split so a pasted
/// URL cannot blow out the line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > width {
            // Hard split: flush the current line, then take width chars
            if !line.is_empty() {
                out.push(std::mem::take(&mut line));
            }
            let cut = word
                .char_indices()
                .nth(width)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            out.push(word[..cut].to_string());
            word = &word[cut..];
        }
        let needed = word.chars().count() + if line.is_empty() { 0 } else { 1 };
        if line.chars().count() + needed > width && !line.is_empty() {
            out.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn heading_rank(level: pulldown_cmark::HeadingLevel) -> u8 {
    use pulldown_cmark::HeadingLevel::*;
    match level {
        H1 => 1,
        H2 => 2,
        H3 => 3,
        H4 => 4,
        H5 => 5,
        H6 => 6,
    }
}

fn next_marker(list_counters: &mut [Option<u64>]) -> String {
    match list_counters.last_mut() {
        Some(Some(n)) => {
            let marker = format!("{n}. ");
            *n += 1;
            marker
        }
        _ => "• ".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Anchor slugs
// ---------------------------------------------------------------------------

/// GitHub-style slug assignment with `-1`, `-2` suffixes for duplicates.
#[derive(Default)]
struct SlugSet {
    seen: std::collections::HashMap<String, usize>,
}

impl SlugSet {
    fn assign(&mut self, title: &str) -> String {
        let base = slugify(title);
        let count = self.seen.entry(base.clone()).or_insert(0);
        let slug = if *count == 0 {
            base.clone()
        } else {
            format!("{base}-{count}")
        };
        *count += 1;
        slug
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
            last_dash = false;
        } else if (ch.is_whitespace() || ch == '-') && !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}
