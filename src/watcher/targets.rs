//! What the change watcher monitors and how signals map back to sources.
//!
//! Config files are watched through their parent directory (non-recursive)
//! so that editors which save by rename keep being observed. Scan
//! directories are watched recursively.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::paths::{ScanDir, ScopeResolver};
use crate::types::{ChangeCategory, Scope};

use super::self_write::normalize;

/// Origin of a signal: what kind of source changed and in which scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub category: ChangeCategory,
    pub scope: Scope,
}

/// Registry of watched config files and scan directories.
#[derive(Debug, Clone, Default)]
pub struct WatchTargets {
    /// Normalized config file path -> scope.
    config_files: HashMap<PathBuf, Scope>,
    /// Parent directories of config files.
    config_dirs: BTreeSet<PathBuf>,
    /// Scan directories, normalized, least specific first.
    scan_dirs: Vec<ScanDir>,
}

impl WatchTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every existing source the resolver currently knows about.
    pub fn resolve(resolver: &ScopeResolver) -> Self {
        let mut targets = Self::new();

        for location in resolver.resolve_all() {
            if let Some(file) = location.config_file.filter(|f| f.is_file()) {
                targets.add_config_file(file, location.scope);
            }
        }

        let scan_dirs = resolver
            .skill_scan_dirs()
            .into_iter()
            .chain(resolver.agent_scan_dirs());
        for dir in scan_dirs.filter(|d| d.path.is_dir()) {
            targets.add_scan_dir(dir);
        }

        targets
    }

    /// Track a config file, returning its directory if it is newly watched.
    pub fn add_config_file(&mut self, path: PathBuf, scope: Scope) -> Option<PathBuf> {
        let path = normalize(&path);
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        self.config_files.insert(path, scope);
        self.config_dirs.insert(parent.clone()).then_some(parent)
    }

    pub fn add_scan_dir(&mut self, mut dir: ScanDir) {
        dir.path = dir.path.canonicalize().unwrap_or(dir.path);
        if !self.scan_dirs.iter().any(|d| d.path == dir.path) {
            self.scan_dirs.push(dir);
        }
    }

    /// Map a raw signal path to its origin, or `None` if nothing tracks it.
    ///
    /// Scan-directory signals take the scope of the deepest directory that
    /// contains the path.
    pub fn classify(&self, path: &Path) -> Option<Origin> {
        let path = normalize(path);

        if let Some(scope) = self.config_files.get(&path) {
            return Some(Origin {
                category: ChangeCategory::Config,
                scope: *scope,
            });
        }

        self.scan_dirs
            .iter()
            .filter(|dir| path.starts_with(&dir.path))
            .max_by_key(|dir| dir.path.components().count())
            .map(|dir| Origin {
                category: dir.category,
                scope: dir.scope,
            })
    }

    pub fn config_files(&self) -> impl Iterator<Item = (&Path, Scope)> {
        self.config_files.iter().map(|(p, s)| (p.as_path(), *s))
    }

    /// Directories to watch non-recursively for config files.
    pub fn config_dirs(&self) -> impl Iterator<Item = &Path> {
        self.config_dirs.iter().map(PathBuf::as_path)
    }

    pub fn scan_dirs(&self) -> &[ScanDir] {
        &self.scan_dirs
    }

    pub fn file_count(&self) -> usize {
        self.config_files.len()
    }

    pub fn dir_count(&self) -> usize {
        self.config_dirs.len() + self.scan_dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.config_files.is_empty() && self.scan_dirs.is_empty()
    }
}
