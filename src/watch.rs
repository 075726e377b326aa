//! Article file watcher — live reload via notify (inotify on Linux).
//!
//! notify::RecommendedWatcher runs callbacks on an internal thread; change
//! notifications are bridged to the main thread over mpsc. Registration is
//! fire-and-forget: a failure is logged and the viewer simply runs without
//! live reload. The viewer debounces `has_changed` before re-parsing, so an
//! editor writing in bursts triggers one reload.

use std::path::Path;
use std::sync::mpsc;

use anyhow::Result;
use log::{debug, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

pub struct ArticleWatcher {
    rx: mpsc::Receiver<()>,
    _watcher: RecommendedWatcher, // Drop stops watching
}

impl ArticleWatcher {
    /// Watch the given file for modifications.
    ///
    /// Linux inotify loses the watch on rename (atomic save), so the parent
    /// directory is watched (NonRecursive) and events are filtered by path.
    pub fn new(path: &Path) -> Result<Self> {
        let canonical = path.canonicalize()?;
        let target = canonical.clone();
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    let ours = event.paths.iter().any(|p| p == &target);
                    if ours && (event.kind.is_modify() || event.kind.is_create()) {
                        let _ = tx.send(());
                    }
                }
            },
            notify::Config::default(),
        )?;
        let parent = canonical
            .parent()
            .ok_or_else(|| anyhow::anyhow!("cannot watch root path"))?;
        watcher.watch(parent, RecursiveMode::NonRecursive)?;
        debug!("watch: registered for {}", canonical.display());

        Ok(Self {
            rx,
            _watcher: watcher,
        })
    }

    /// Fire-and-forget registration: failures are logged, never surfaced,
    /// never retried.
    pub fn register(path: &Path) -> Option<Self> {
        match Self::new(path) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("watch: registration failed for {}: {e:#}", path.display());
                None
            }
        }
    }

    /// Return true if the file has changed since last check (non-blocking).
    /// Multiple queued notifications collapse into a single true.
    pub fn has_changed(&self) -> bool {
        let mut changed = false;
        while self.rx.try_recv().is_ok() {
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_missing_file_is_silent_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.md");
        assert!(ArticleWatcher::register(&missing).is_none());
    }

    #[test]
    fn no_events_means_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("article.md");
        std::fs::write(&file, "# hi\n").unwrap();
        let watcher = ArticleWatcher::register(&file).expect("watch a real file");
        assert!(!watcher.has_changed());
    }
}
