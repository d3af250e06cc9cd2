//! Per-path debouncing for raw filesystem signals.
//!
//! Editors and formatters often touch a file several times per save. Each
//! path is either idle or pending with a deadline; a new signal on a pending
//! path pushes its deadline out instead of adding a second entry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default quiet period before a pending path fires.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Debounces change signals by path.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending changes: path -> last signal.
    pending: HashMap<PathBuf, Instant>,
    /// How long a path must stay quiet before it is ready.
    duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given duration in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Record a signal now, resetting the path's deadline.
    pub fn record(&mut self, path: PathBuf) {
        self.record_at(path, Instant::now());
    }

    pub fn record_at(&mut self, path: PathBuf, at: Instant) {
        self.pending.insert(path, at);
    }

    /// Cancel a pending path.
    pub fn remove(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Take all paths that have been quiet for the debounce duration.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        self.take_ready_at(Instant::now())
    }

    pub fn take_ready_at(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut ready = Vec::new();

        self.pending.retain(|path, last_signal| {
            if now.saturating_duration_since(*last_signal) >= self.duration {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });

        ready.sort();
        ready
    }

    /// Earliest instant at which some pending path becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().map(|last| *last + self.duration)
    }

    /// Check if there are any pending changes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_debouncer_basic() {
        let mut debouncer = Debouncer::new(50);
        let t0 = Instant::now();

        let path = PathBuf::from("/test/opencode.jsonc");
        debouncer.record_at(path.clone(), t0);

        assert!(debouncer.take_ready_at(t0 + ms(10)).is_empty());
        assert!(debouncer.has_pending());
        assert_eq!(debouncer.next_deadline(), Some(t0 + ms(50)));

        let ready = debouncer.take_ready_at(t0 + ms(50));
        assert_eq!(ready, vec![path]);
        assert!(!debouncer.has_pending());
        assert_eq!(debouncer.next_deadline(), None);
    }

    #[test]
    fn test_debouncer_resets_on_new_signal() {
        let mut debouncer = Debouncer::new(50);
        let t0 = Instant::now();
        let path = PathBuf::from("/test/opencode.jsonc");

        debouncer.record_at(path.clone(), t0);
        debouncer.record_at(path.clone(), t0 + ms(30));

        // 60ms after the first signal but only 30ms after the second.
        assert!(debouncer.take_ready_at(t0 + ms(60)).is_empty());
        assert_eq!(debouncer.pending_count(), 1);

        let ready = debouncer.take_ready_at(t0 + ms(80));
        assert_eq!(ready.len(), 1);
    }

    #[test]
    fn test_debouncer_keeps_paths_independent() {
        let mut debouncer = Debouncer::new(50);
        let t0 = Instant::now();

        let path1 = PathBuf::from("/test/a.json");
        let path2 = PathBuf::from("/test/b.json");

        debouncer.record_at(path1.clone(), t0);
        debouncer.record_at(path2.clone(), t0 + ms(30));

        assert_eq!(debouncer.take_ready_at(t0 + ms(55)), vec![path1]);
        assert!(debouncer.has_pending());
        assert_eq!(debouncer.take_ready_at(t0 + ms(80)), vec![path2]);
    }

    #[test]
    fn test_debouncer_remove_and_clear() {
        let mut debouncer = Debouncer::new(50);
        let path = PathBuf::from("/test/a.json");

        debouncer.record(path.clone());
        debouncer.remove(&path);
        assert!(!debouncer.has_pending());

        debouncer.record(path.clone());
        debouncer.record(PathBuf::from("/test/b.json"));
        debouncer.clear();
        assert_eq!(debouncer.pending_count(), 0);
    }
}
