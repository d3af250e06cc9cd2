//! Registry of this process's own writes.
//!
//! Every write made through the config writer is recorded here before the
//! bytes hit disk. The watcher consults it so the filesystem echo of our own
//! write is not reported as an external change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default suppression window in milliseconds.
pub const DEFAULT_SELF_WRITE_WINDOW_MS: u64 = 500;

/// Time-windowed map from path to the instant we last wrote it.
#[derive(Debug)]
pub struct SelfWriteTracker {
    window: Duration,
    writes: Mutex<HashMap<PathBuf, Instant>>,
}

impl SelfWriteTracker {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            writes: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a write to `path` happening now.
    pub fn record(&self, path: &Path) {
        self.record_at(path, Instant::now());
    }

    pub fn record_at(&self, path: &Path, at: Instant) {
        self.writes.lock().insert(normalize(path), at);
    }

    /// Whether we wrote `path` within the window. Expired entries are dropped.
    pub fn is_recent(&self, path: &Path) -> bool {
        self.is_recent_at(path, Instant::now())
    }

    pub fn is_recent_at(&self, path: &Path, now: Instant) -> bool {
        let key = normalize(path);
        let mut writes = self.writes.lock();
        match writes.get(&key) {
            Some(at) if now.saturating_duration_since(*at) < self.window => true,
            Some(_) => {
                writes.remove(&key);
                false
            }
            None => false,
        }
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut writes = self.writes.lock();
        let before = writes.len();
        writes.retain(|_, at| now.saturating_duration_since(*at) < self.window);
        before - writes.len()
    }

    pub fn clear(&self) {
        self.writes.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.writes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.lock().is_empty()
    }
}

impl Default for SelfWriteTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SELF_WRITE_WINDOW_MS)
    }
}

/// Canonical form used to compare paths from writers and from the watcher.
///
/// The parent directory is canonicalized when it exists so symlinked
/// prefixes (e.g. `/tmp` on macOS) compare equal; the file itself may not
/// exist yet or may already be gone.
pub fn normalize(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => parent
            .canonicalize()
            .map(|dir| dir.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}
