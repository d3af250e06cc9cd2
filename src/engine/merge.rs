use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{KeyPath, PathSegment, Scope};

/// Keys whose array values accumulate across scopes instead of replacing.
pub const CONCAT_KEYS: [&str; 2] = ["instructions", "plugins"];

/// Merge `over` onto `base`, returning a new object.
///
/// - arrays under a [`CONCAT_KEYS`] key: base elements then override
///   elements, duplicates kept
/// - two objects: merged recursively
/// - anything else: the override value wins, including `null`
pub fn deep_merge(base: &Map<String, Value>, over: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();

    for (key, value) in over {
        let combined = match (merged.get(key), value) {
            (Some(Value::Array(left)), Value::Array(right)) if CONCAT_KEYS.contains(&key.as_str()) => {
                Value::Array(left.iter().chain(right).cloned().collect())
            }
            (Some(Value::Object(left)), Value::Object(right)) => {
                Value::Object(deep_merge(left, right))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }

    merged
}

/// Value at `path`, if every segment matches.
pub fn lookup<'a>(value: &'a Value, path: &KeyPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(value, |current, segment| match segment {
            PathSegment::Key(key) => current.as_object()?.get(key),
            PathSegment::Index(index) => current.as_array()?.get(*index),
        })
}

/// [`lookup`] starting from an object's entries. The root path has no value.
fn lookup_in<'a>(map: &'a Map<String, Value>, path: &KeyPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let PathSegment::Key(key) = first else {
        return None;
    };
    let rest: KeyPath = rest.iter().cloned().collect();
    lookup(map.get(key)?, &rest)
}

/// One present source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopedConfig {
    pub scope: Scope,
    pub value: Map<String, Value>,
    /// Exact text as read; `None` only for [`ScopedConfig::empty`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ScopedConfig {
    /// Stand-in for an absent scope.
    pub fn empty(scope: Scope) -> Self {
        Self {
            scope,
            value: Map::new(),
            raw: None,
            path: None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.raw.is_none()
    }
}

/// The effective configuration plus the sources it was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedConfig {
    pub merged: Map<String, Value>,
    /// Present scopes only, in precedence order.
    pub sources: Vec<ScopedConfig>,
}

impl MergedConfig {
    /// Fold `sources` in the order given.
    pub fn from_sources(sources: Vec<ScopedConfig>) -> Self {
        let merged = sources
            .iter()
            .fold(Map::new(), |acc, source| deep_merge(&acc, &source.value));
        Self { merged, sources }
    }

    pub fn source(&self, scope: Scope) -> Option<&ScopedConfig> {
        self.sources.iter().find(|s| s.scope == scope)
    }

    pub fn get(&self, path: &KeyPath) -> Option<&Value> {
        lookup_in(&self.merged, path)
    }

    /// The scope whose value for `path` survives in the merged result.
    ///
    /// Concatenated arrays have no single origin; the highest contributing
    /// scope is returned for them.
    pub fn origin_of(&self, path: &KeyPath) -> Option<Scope> {
        self.sources
            .iter()
            .rev()
            .find(|source| lookup_in(&source.value, path).is_some())
            .map(|source| source.scope)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.merged)
    }
}
