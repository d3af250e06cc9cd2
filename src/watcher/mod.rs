//! Live synchronization of configuration sources.
//!
//! A single `notify::RecommendedWatcher` feeds a pure event pipeline that
//! drops our own writes and coalesces bursts before notifying consumers.
//!
//! # Architecture
//!
//! ```text
//! ChangeWatcher
//!   - Single notify::RecommendedWatcher
//!   - WatchTargets (config files -> scope, scan dirs -> scope)
//!   - EventPipeline
//!       classify -> SelfWriteTracker -> Debouncer
//!         |
//!   ChangeNotifier
//!     +-------------+
//!     |             |
//!  callbacks   broadcast receivers
//! ```

mod change_watcher;
mod debouncer;
mod error;
mod notifier;
mod pipeline;
mod self_write;
mod targets;

pub use change_watcher::{ChangeWatcher, ChangeWatcherBuilder, WatchSummary};
pub use debouncer::{DEFAULT_DEBOUNCE_MS, Debouncer};
pub use error::WatchError;
pub use notifier::{ChangeNotifier, DEFAULT_EVENT_CAPACITY, Subscription};
pub use pipeline::{EventPipeline, SignalOutcome};
pub use self_write::{DEFAULT_SELF_WRITE_WINDOW_MS, SelfWriteTracker, normalize};
pub use targets::{Origin, WatchTargets};
