//! Read-only commands: paths, show, get.

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

use crate::engine::ConfigLoader;
use crate::paths::{ResolvedLocation, ScanDir, ScopeResolver};
use crate::types::{KeyPath, Scope};

use super::print_json;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Locations {
    scopes: Vec<ResolvedLocation>,
    skill_dirs: Vec<ScanDir>,
    agent_dirs: Vec<ScanDir>,
}

pub fn run_paths(resolver: &ScopeResolver) -> anyhow::Result<()> {
    print_json(&Locations {
        scopes: resolver.resolve_all(),
        skill_dirs: resolver.skill_scan_dirs(),
        agent_dirs: resolver.agent_scan_dirs(),
    })
}

/// Print the merge, one scope's own document, or the merge with its sources.
pub fn run_show(resolver: &ScopeResolver, scope: Option<Scope>, sources: bool) -> anyhow::Result<()> {
    let loader = ConfigLoader::new(resolver.clone());

    if let Some(scope) = scope {
        let scoped = loader.load_scope_or_empty(scope)?;
        return print_json(&scoped.value);
    }

    let merged = loader.load_all()?;
    if sources {
        print_json(&merged)
    } else {
        print_json(&merged.merged)
    }
}

#[derive(Serialize)]
struct Lookup<'a> {
    key: &'a str,
    value: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<Scope>,
}

pub fn run_get(resolver: &ScopeResolver, key: &str) -> anyhow::Result<()> {
    let merged = ConfigLoader::new(resolver.clone()).load_all()?;
    let path = KeyPath::parse_dotted(key);
    let value = merged
        .get(&path)
        .with_context(|| format!("'{key}' is not set in any scope"))?;

    print_json(&Lookup {
        key,
        value,
        origin: merged.origin_of(&path),
    })
}
