//! Write commands: set, unset, replace.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;

use crate::engine::{ConfigWriter, parse_document};
use crate::paths::ScopeResolver;
use crate::types::{KeyPath, Scope};
use crate::watcher::SelfWriteTracker;

use super::print_json;

fn writer(resolver: &ScopeResolver) -> ConfigWriter {
    ConfigWriter::new(resolver.clone(), Arc::new(SelfWriteTracker::default()))
}

/// JSON if it parses, otherwise the raw text as a string.
pub fn parse_cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn run_set(resolver: &ScopeResolver, scope: Scope, key: &str, raw: &str) -> anyhow::Result<()> {
    let key_path = KeyPath::parse_dotted(key);
    anyhow::ensure!(!key_path.is_root(), "a key is required");

    let report = writer(resolver).set_scope_value(scope, &key_path, &parse_cli_value(raw))?;
    print_json(&report)
}

pub fn run_unset(resolver: &ScopeResolver, scope: Scope, key: &str) -> anyhow::Result<()> {
    let key_path = KeyPath::parse_dotted(key);
    anyhow::ensure!(!key_path.is_root(), "a key is required");

    let report = writer(resolver).remove_scope_value(scope, &key_path)?;
    print_json(&report)
}

pub fn run_replace(resolver: &ScopeResolver, scope: Scope, file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let document = parse_document(&text, scope, Some(file))?;

    let report = writer(resolver).replace_scope(scope, &document)?;
    print_json(&report)
}
