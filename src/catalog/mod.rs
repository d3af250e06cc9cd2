//! Skill and agent markdown documents found in the scan directories.
//!
//! Both kinds are markdown files with YAML frontmatter. Directories are
//! scanned least specific first; a project-scope entry replaces an earlier
//! entry with the same name, while a second global entry never replaces the
//! first.

mod agents;
pub mod frontmatter;
mod skills;

pub use agents::{Agent, AgentFrontmatter, list_agents, parse_agent_file, write_agent};
pub use skills::{Skill, SkillFrontmatter, list_skills, parse_skill_file, write_skill};

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::engine::ConfigError;
use crate::types::Scope;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid frontmatter in {}: {source}", .path.display())]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{} is missing '{field}'", .path.display())]
    MissingField { path: PathBuf, field: &'static str },

    #[error("'{name}' is not a usable document name")]
    InvalidName { name: String },

    #[error(transparent)]
    Write(#[from] ConfigError),
}

/// Names become file or directory names, so keep them to one plain segment.
fn check_name(name: &str) -> Result<(), CatalogError> {
    let plain = !name.trim().is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some_and(|n| n == name);
    if plain {
        Ok(())
    } else {
        Err(CatalogError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Insert or shadow an entry by name, keeping first-seen order.
fn shadow<T>(entries: &mut Vec<T>, entry: T, name_of: impl Fn(&T) -> &str, scope: Scope) {
    let name = name_of(&entry).to_string();
    match entries.iter().position(|e| name_of(e) == name) {
        Some(index) if scope >= Scope::Project => entries[index] = entry,
        Some(_) => {}
        None => entries.push(entry),
    }
}

/// Sorted, non-hidden entries of `dir`. Unreadable directories are empty.
fn visible_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(read) = std::fs::read_dir(dir) else {
        crate::debug_event!("catalog", "unreadable", "{}", dir.display());
        return Vec::new();
    };

    let mut paths: Vec<PathBuf> = read
        .filter_map(Result::ok)
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.path())
        .collect();
    paths.sort();
    paths
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}
