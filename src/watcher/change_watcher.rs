//! Filesystem driver for the event pipeline.

use std::sync::Arc;
use std::time::Instant;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::WatchSettings;
use crate::paths::ScopeResolver;
use crate::types::ChangeEvent;

use super::debouncer::DEFAULT_DEBOUNCE_MS;
use super::error::WatchError;
use super::notifier::{ChangeNotifier, Subscription};
use super::pipeline::EventPipeline;
use super::self_write::SelfWriteTracker;
use super::targets::WatchTargets;

/// Capacity of the channel between notify's thread and the event loop.
const RAW_EVENT_CAPACITY: usize = 100;

/// What a successful `start()` is watching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSummary {
    pub config_files: usize,
    pub directories: usize,
    /// Monitors that could not be established.
    pub skipped: usize,
}

struct Running {
    _watcher: RecommendedWatcher,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    targets: WatchTargets,
}

/// Watches every resolved config source and reports external changes.
///
/// ```text
/// notify thread ──mpsc──▶ event loop ──▶ EventPipeline ──▶ ChangeNotifier
///                            ▲                 ▲
///                     CancellationToken  SelfWriteTracker (shared with writers)
/// ```
pub struct ChangeWatcher {
    resolver: ScopeResolver,
    tracker: Arc<SelfWriteTracker>,
    notifier: ChangeNotifier,
    debounce_ms: u64,
    running: Option<Running>,
}

impl ChangeWatcher {
    pub fn builder() -> ChangeWatcherBuilder {
        ChangeWatcherBuilder::new()
    }

    /// Resolve targets and begin monitoring. Restarts if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<WatchSummary, WatchError> {
        self.stop();

        let handle = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let targets = WatchTargets::resolve(&self.resolver);

        let (tx, rx) = mpsc::channel(RAW_EVENT_CAPACITY);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The receiver is gone once the loop stops.
            let _ = tx.blocking_send(res);
        })?;

        let mut summary = WatchSummary {
            config_files: targets.file_count(),
            ..WatchSummary::default()
        };

        let monitors = targets
            .config_dirs()
            .map(|dir| (dir.to_path_buf(), RecursiveMode::NonRecursive))
            .chain(
                targets
                    .scan_dirs()
                    .iter()
                    .map(|dir| (dir.path.clone(), RecursiveMode::Recursive)),
            );

        for (path, mode) in monitors {
            match watcher.watch(&path, mode) {
                Ok(()) => {
                    crate::debug_event!("watcher", "watching", "{}", path.display());
                    summary.directories += 1;
                }
                Err(e) => {
                    let err = WatchError::PathWatchFailed {
                        path,
                        reason: e.to_string(),
                    };
                    tracing::warn!("[watcher] {err}");
                    summary.skipped += 1;
                }
            }
        }

        if targets.is_empty() {
            tracing::warn!("[watcher] no config sources to watch");
        } else {
            crate::log_event!(
                "watcher",
                "monitoring",
                "{} files in {} directories",
                summary.config_files,
                summary.directories
            );
        }

        let cancel = CancellationToken::new();
        let pipeline = EventPipeline::new(targets.clone(), self.tracker.clone(), self.debounce_ms);
        let task = handle.spawn(run(
            pipeline,
            rx,
            self.notifier.clone(),
            self.tracker.clone(),
            cancel.clone(),
        ));

        self.running = Some(Running {
            _watcher: watcher,
            cancel,
            task,
            targets,
        });

        crate::log_event!("watcher", "started");
        Ok(summary)
    }

    /// Release every monitor and cancel pending timers. No events are
    /// delivered after this returns.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            running.task.abort();
            crate::log_event!("watcher", "stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// What is currently being watched, if running.
    pub fn targets(&self) -> Option<&WatchTargets> {
        self.running.as_ref().map(|r| &r.targets)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.notifier.on_change(listener)
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// The tracker writers must share for their writes to be suppressed.
    pub fn tracker(&self) -> Arc<SelfWriteTracker> {
        self.tracker.clone()
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    mut pipeline: EventPipeline,
    mut rx: mpsc::Receiver<notify::Result<Event>>,
    notifier: ChangeNotifier,
    tracker: Arc<SelfWriteTracker>,
    cancel: CancellationToken,
) {
    loop {
        let deadline = pipeline.next_deadline();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            received = rx.recv() => match received {
                Some(Ok(event)) => handle_event(&mut pipeline, event),
                Some(Err(e)) => tracing::warn!("[watcher] file watch error: {e}"),
                None => break,
            },

            _ = sleep_until(deadline) => {
                for event in pipeline.take_ready() {
                    crate::log_event!(
                        "watcher",
                        "changed",
                        "{} {} {}",
                        event.category,
                        event.scope,
                        event.path.display()
                    );
                    notifier.send(event);
                }
                tracker.sweep();
            }
        }
    }

    pipeline.clear();
    crate::debug_event!("watcher", "loop exited");
}

fn handle_event(pipeline: &mut EventPipeline, event: Event) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }
    for path in &event.paths {
        let outcome = pipeline.signal(path);
        crate::debug_event!(
            "watcher",
            "signal",
            "{:?} {} -> {outcome:?}",
            event.kind,
            path.display()
        );
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        None => std::future::pending().await,
    }
}

/// Builder for constructing a [`ChangeWatcher`].
pub struct ChangeWatcherBuilder {
    resolver: Option<ScopeResolver>,
    tracker: Option<Arc<SelfWriteTracker>>,
    notifier: Option<ChangeNotifier>,
    debounce_ms: u64,
}

impl ChangeWatcherBuilder {
    pub fn new() -> Self {
        Self {
            resolver: None,
            tracker: None,
            notifier: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    /// Apply watcher settings. An explicitly set tracker or notifier wins.
    pub fn settings(mut self, settings: &WatchSettings) -> Self {
        self.debounce_ms = settings.debounce_ms;
        if self.tracker.is_none() {
            self.tracker = Some(Arc::new(SelfWriteTracker::new(
                settings.self_write_window_ms,
            )));
        }
        if self.notifier.is_none() {
            self.notifier = Some(ChangeNotifier::new(settings.event_capacity));
        }
        self
    }

    pub fn resolver(mut self, resolver: ScopeResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Share a tracker with the config writer.
    pub fn tracker(mut self, tracker: Arc<SelfWriteTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn build(self) -> ChangeWatcher {
        ChangeWatcher {
            resolver: self.resolver.unwrap_or_default(),
            tracker: self.tracker.unwrap_or_default(),
            notifier: self.notifier.unwrap_or_default(),
            debounce_ms: self.debounce_ms,
            running: None,
        }
    }
}

impl Default for ChangeWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
