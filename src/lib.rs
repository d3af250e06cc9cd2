pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod jsonc;
pub mod logging;
pub mod paths;
pub mod types;
pub mod validation;
pub mod watcher;

pub use types::*;
pub use config::Settings;
pub use engine::{ConfigError, ConfigLoader, ConfigWriter, MergedConfig, ScopedConfig, WriteReport, deep_merge};
pub use paths::{Environment, Platform, ResolvedLocation, ScanDir, ScopeResolver};
pub use watcher::{ChangeNotifier, ChangeWatcher, SelfWriteTracker, Subscription, WatchError};
