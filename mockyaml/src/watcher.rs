//! Debounced filesystem watcher over the scenario root.
//!
//! Watches recursively for `.yaml`/`.yml` changes and emits a single
//! coalesced signal per debounce window on a tokio channel — the receiver
//! doesn't need to know which file changed, since a reload always rewalks
//! the whole root.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as tokio_mpsc;

use crate::error::{MockError, Result};

/// Owns the underlying OS watch handle and the debounce thread's lifetime.
pub struct ScenarioWatcher {
    _watcher: RecommendedWatcher,
}

impl ScenarioWatcher {
    /// Starts watching `root` recursively. Returns the watcher (drop to
    /// stop watching) and a receiver that yields `()` once per debounce
    /// window after at least one YAML file changed.
    pub fn spawn(root: &Path, debounce: Duration) -> Result<(Self, tokio_mpsc::UnboundedReceiver<()>)> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())
            .map_err(|e| MockError::Io(std::io::Error::other(e.to_string())))?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| MockError::Io(std::io::Error::other(e.to_string())))?;

        let (signal_tx, signal_rx) = tokio_mpsc::unbounded_channel();
        std::thread::spawn(move || debounce_loop(rx, signal_tx, debounce));

        Ok((Self { _watcher: watcher }, signal_rx))
    }
}

fn debounce_loop(
    rx: mpsc::Receiver<notify::Result<Event>>,
    signal_tx: tokio_mpsc::UnboundedSender<()>,
    debounce: Duration,
) {
    let mut dirty = false;
    let mut last_event = Instant::now();
    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(event)) => {
                if is_yaml_change(&event) {
                    dirty = true;
                    last_event = Instant::now();
                }
            }
            Ok(Err(_)) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if dirty && last_event.elapsed() >= debounce {
                    dirty = false;
                    if signal_tx.send(()).is_err() {
                        return;
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn is_yaml_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(is_yaml_path)
}

fn is_yaml_path(path: &PathBuf) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detects_yaml_file_creation() {
        let dir = tempfile::tempdir().unwrap();
        let (_watcher, mut rx) = ScenarioWatcher::spawn(dir.path(), Duration::from_millis(100)).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(dir.path().join("new.yaml"), "id: a\n").unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(result.is_ok(), "expected a debounced change signal");
    }

    #[test]
    fn non_yaml_changes_are_ignored() {
        let event = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(PathBuf::from("/tmp/file.txt"));
        assert!(!is_yaml_change(&event));
    }
}
