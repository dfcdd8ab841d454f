//! Recursive filesystem watcher.
//!
//! Wraps a `notify` watcher over the served root and turns raw OS
//! notifications into [`ChangeEvent`]s on a bounded channel. The notify
//! callback never blocks: when the channel is full the event is dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glob::Pattern;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use super::debouncer::PathDebouncer;
use crate::error::StartError;

/// How often debounced events are checked for expiry.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Kind of filesystem change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A file or directory appeared.
    Created,
    /// Content, metadata or name changed.
    Modified,
    /// A file or directory disappeared.
    Removed,
}

impl From<lr_config::ReloadOn> for ChangeKind {
    fn from(value: lr_config::ReloadOn) -> Self {
        match value {
            lr_config::ReloadOn::Create => Self::Created,
            lr_config::ReloadOn::Modify => Self::Modified,
            lr_config::ReloadOn::Remove => Self::Removed,
        }
    }
}

/// A change under the watched root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path that changed.
    pub path: PathBuf,
    /// What happened to it.
    pub kind: ChangeKind,
}

/// Watcher settings.
#[derive(Clone, Debug)]
pub struct WatchOptions {
    /// Glob patterns relative to the root. Empty matches everything.
    pub patterns: Vec<String>,
    /// Change kinds that produce events.
    pub kinds: Vec<ChangeKind>,
    /// Per-path debounce window. Zero emits every event as it arrives.
    pub debounce: Duration,
    /// Capacity of the event channel.
    pub queue_capacity: usize,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            kinds: vec![ChangeKind::Modified],
            debounce: Duration::ZERO,
            queue_capacity: 256,
        }
    }
}

/// Decides which raw events become [`ChangeEvent`]s.
struct EventFilter {
    root: PathBuf,
    patterns: Vec<Pattern>,
    kinds: Vec<ChangeKind>,
}

impl EventFilter {
    fn accepts_path(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches_path(relative))
    }

    fn accepts_kind(&self, kind: ChangeKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Convert a `notify::EventKind` to a [`ChangeKind`].
///
/// Returns `None` for event kinds that are not changes (e.g., Access).
fn change_kind(kind: notify::EventKind) -> Option<ChangeKind> {
    match kind {
        notify::EventKind::Create(_) => Some(ChangeKind::Created),
        notify::EventKind::Modify(_) => Some(ChangeKind::Modified),
        notify::EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

/// Queue an event without blocking the caller.
fn enqueue(tx: &mpsc::Sender<ChangeEvent>, event: ChangeEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            tracing::warn!(path = %event.path.display(), "Change queue full, dropping event");
        }
        Err(TrySendError::Closed(_)) => {}
    }
}

/// Running filesystem watcher.
///
/// Dropping it (or calling [`stop`](Self::stop)) stops observation and closes
/// the event channel once pending sends complete.
pub struct FsWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
    drain: Option<JoinHandle<()>>,
}

impl FsWatcher {
    /// Start watching `root` recursively.
    ///
    /// Only changes made after this call are reported. Directories created
    /// later are picked up automatically. With a non-zero debounce window this
    /// must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not accessible, a pattern is invalid,
    /// or the OS watcher cannot be created.
    pub fn start(
        root: &Path,
        options: WatchOptions,
    ) -> Result<(Self, mpsc::Receiver<ChangeEvent>), StartError> {
        let root = root.canonicalize().map_err(|source| StartError::RootDir {
            path: root.to_path_buf(),
            source,
        })?;

        let patterns = options
            .patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| StartError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let filter = EventFilter {
            root: root.clone(),
            patterns,
            kinds: options.kinds,
        };
        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));

        let debouncer =
            (!options.debounce.is_zero()).then(|| Arc::new(PathDebouncer::new(options.debounce)));

        let mut watcher = {
            let debouncer = debouncer.clone();
            let tx = tx.clone();
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "File watcher error");
                        return;
                    }
                };
                let Some(kind) = change_kind(event.kind) else {
                    return;
                };

                if !filter.accepts_kind(kind) {
                    return;
                }

                for path in event.paths {
                    if !filter.accepts_path(&path) {
                        continue;
                    }
                    tracing::debug!(path = %path.display(), ?kind, "Recorded filesystem event");
                    match &debouncer {
                        Some(debouncer) => debouncer.touch(path, kind, Instant::now()),
                        None => enqueue(&tx, ChangeEvent { path, kind }),
                    }
                }
            })?
        };
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let drain = debouncer.map(|debouncer| {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(DRAIN_INTERVAL);
                loop {
                    interval.tick().await;
                    for event in debouncer.release(Instant::now()) {
                        enqueue(&tx, event);
                    }
                }
            })
        });

        tracing::info!(root = %root.display(), "Watching for changes");

        Ok((
            Self {
                root,
                _watcher: watcher,
                drain,
            },
            rx,
        ))
    }

    /// Canonical root being watched.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching.
    pub fn stop(self) {
        tracing::debug!(root = %self.root.display(), "Stopping file watcher");
    }
}

impl Drop for FsWatcher {
    fn drop(&mut self) {
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
    }
}
