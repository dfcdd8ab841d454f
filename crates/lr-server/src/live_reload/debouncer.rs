//! Trailing-edge debounce for change events.
//!
//! Every change ends in the same reload, so what happened to a path does not
//! matter here, only when it went quiet. A path is held until no event for it
//! has arrived for a full window, then released once with the latest kind.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::watcher::{ChangeEvent, ChangeKind};

/// Paths waiting for their window to elapse.
pub(crate) struct PathDebouncer {
    window: Duration,
    quiet_since: Mutex<HashMap<PathBuf, (ChangeKind, Instant)>>,
}

impl PathDebouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            quiet_since: Mutex::new(HashMap::new()),
        }
    }

    /// Note an event seen at `at`, restarting the path's window.
    pub(crate) fn touch(&self, path: PathBuf, kind: ChangeKind, at: Instant) {
        self.lock().insert(path, (kind, at));
    }

    /// Release every path that has been quiet for a full window by `now`.
    pub(crate) fn release(&self, now: Instant) -> Vec<ChangeEvent> {
        let window = self.window;
        let mut released = Vec::new();
        self.lock().retain(|path, (kind, last)| {
            if now.saturating_duration_since(*last) < window {
                return true;
            }
            released.push(ChangeEvent {
                path: path.clone(),
                kind: *kind,
            });
            false
        });
        released
    }

    #[cfg(test)]
    fn held(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, (ChangeKind, Instant)>> {
        self.quiet_since.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
