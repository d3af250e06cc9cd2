//! Signal-to-event pipeline, independent of any filesystem backend.
//!
//! Raw signals go through three stages:
//!
//! 1. classification against [`WatchTargets`] (untracked paths are ignored)
//! 2. self-write suppression via the shared [`SelfWriteTracker`]
//! 3. per-path debouncing
//!
//! Every method has an `_at` variant that takes the current instant so the
//! whole flow can be driven deterministically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::types::ChangeEvent;

use super::debouncer::Debouncer;
use super::self_write::{SelfWriteTracker, normalize};
use super::targets::{Origin, WatchTargets};

/// What happened to a single raw signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Path is not a tracked source.
    Ignored,
    /// Path was written by this process within the suppression window.
    Suppressed,
    /// Signal was accepted and the path's debounce timer (re)started.
    Debounced,
}

pub struct EventPipeline {
    targets: WatchTargets,
    tracker: Arc<SelfWriteTracker>,
    debouncer: Debouncer,
    /// Origin of each pending path, captured at signal time.
    origins: HashMap<PathBuf, Origin>,
}

impl EventPipeline {
    pub fn new(targets: WatchTargets, tracker: Arc<SelfWriteTracker>, debounce_ms: u64) -> Self {
        Self {
            targets,
            tracker,
            debouncer: Debouncer::new(debounce_ms),
            origins: HashMap::new(),
        }
    }

    pub fn targets(&self) -> &WatchTargets {
        &self.targets
    }

    pub fn signal(&mut self, path: &Path) -> SignalOutcome {
        self.signal_at(path, Instant::now())
    }

    pub fn signal_at(&mut self, path: &Path, now: Instant) -> SignalOutcome {
        let Some(origin) = self.targets.classify(path) else {
            return SignalOutcome::Ignored;
        };

        if self.tracker.is_recent_at(path, now) {
            crate::debug_event!("watcher", "suppressed", "{}", path.display());
            return SignalOutcome::Suppressed;
        }

        let key = normalize(path);
        self.origins.insert(key.clone(), origin);
        self.debouncer.record_at(key, now);
        SignalOutcome::Debounced
    }

    /// Drain every path whose debounce window has elapsed.
    pub fn take_ready(&mut self) -> Vec<ChangeEvent> {
        self.take_ready_at(Instant::now())
    }

    pub fn take_ready_at(&mut self, now: Instant) -> Vec<ChangeEvent> {
        self.debouncer
            .take_ready_at(now)
            .into_iter()
            .filter_map(|path| {
                let origin = self.origins.remove(&path)?;
                Some(ChangeEvent::modified(origin.category, origin.scope, path))
            })
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    pub fn pending_count(&self) -> usize {
        self.debouncer.pending_count()
    }

    /// Cancel all pending timers.
    pub fn clear(&mut self) {
        self.debouncer.clear();
        self.origins.clear();
    }
}
