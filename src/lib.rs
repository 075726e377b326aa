//! lectern — a long-form article viewer for modern terminals.
//!
//! The crate splits into a pure core and a thin I/O shell. `controller`
//! and `rate_limit` hold the scroll-state logic (progress, back-to-top,
//! active-section tracking, throttling) with no terminal dependency;
//! `document` turns Markdown into row-addressed layout; `viewer` wires
//! everything to crossterm.

pub mod config;
pub mod controller;
pub mod device;
pub mod document;
pub mod rate_limit;
pub mod theme;
pub mod viewer;
pub mod watch;
