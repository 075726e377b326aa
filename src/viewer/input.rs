//! Input processing layer: key mapping and numeric prefix accumulator.
//!
//! Pure logic, no I/O. All functions are deterministic and testable.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const MAX_SECTION_NUM: u32 = 9_999;

/// Accumulated numeric prefix for vim/less-style commands.
///
/// Users type digits then a command character: `3s` jumps to section 3,
/// `10j` scrolls 10 steps down.
pub(super) struct InputAccumulator {
    count: Option<u32>,
}

impl InputAccumulator {
    pub(super) fn new() -> Self {
        Self { count: None }
    }

    /// Feed a digit ('0'..='9'). Returns false if overflow would occur.
    fn push_digit(&mut self, d: u32) -> bool {
        let current = self.count.unwrap_or(0);
        let new = current.saturating_mul(10).saturating_add(d);
        if new > MAX_SECTION_NUM {
            return false; // ignore further digits
        }
        self.count = Some(new);
        true
    }

    /// Take the accumulated count, resetting to None.
    fn take(&mut self) -> Option<u32> {
        self.count.take()
    }

    /// Peek at the current accumulated count without consuming it.
    pub(super) fn peek(&self) -> Option<u32> {
        self.count
    }

    pub(super) fn reset(&mut self) {
        self.count = None;
    }

    pub(super) fn is_active(&self) -> bool {
        self.count.is_some()
    }
}

/// Actions produced by key input processing.
pub(super) enum Action {
    Quit,
    ScrollDown(u32),
    ScrollUp(u32),
    HalfPageDown(u32),
    HalfPageUp(u32),
    JumpToTop,
    JumpToBottom,
    /// 1-based TOC section number.
    JumpToSection(u32),
    SectionPrompt,
    ToggleTheme,
    CancelInput,
    /// A digit was accumulated; caller should redraw the status bar.
    Digit,
}

/// Map a key event to an `Action`, consuming/updating the accumulator as
/// needed. Returns `None` for unknown keys (caller should reset the
/// accumulator).
pub(super) fn map_key_event(key: KeyEvent, acc: &mut InputAccumulator) -> Option<Action> {
    let KeyEvent {
        code, modifiers, ..
    } = key;

    match (code, modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Action::Quit),

        // Esc: cancel pending input
        (KeyCode::Esc, _) => {
            acc.reset();
            Some(Action::CancelInput)
        }

        // Digits: accumulate
        (KeyCode::Char(c @ '0'..='9'), KeyModifiers::NONE) => {
            let d = c as u32 - '0' as u32;
            acc.push_digit(d);
            Some(Action::Digit)
        }

        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => {
            let count = acc.take().unwrap_or(1);
            Some(Action::ScrollDown(count))
        }
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => {
            let count = acc.take().unwrap_or(1);
            Some(Action::ScrollUp(count))
        }
        (KeyCode::Char('d'), _) | (KeyCode::PageDown, _) => {
            let count = acc.take().unwrap_or(1);
            Some(Action::HalfPageDown(count))
        }
        (KeyCode::Char('u'), _) | (KeyCode::PageUp, _) => {
            let count = acc.take().unwrap_or(1);
            Some(Action::HalfPageUp(count))
        }

        // Back to top / bottom
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => {
            acc.reset();
            Some(Action::JumpToTop)
        }
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => {
            acc.reset();
            Some(Action::JumpToBottom)
        }

        // Section anchor jump: `3s` → section 3, bare `s` → prompt
        (KeyCode::Char('s'), _) | (KeyCode::Enter, _) => match acc.take() {
            None => Some(Action::SectionPrompt),
            Some(n) => Some(Action::JumpToSection(n)),
        },

        (KeyCode::Char('t'), _) => Some(Action::ToggleTheme),

        _ => None,
    }
}
