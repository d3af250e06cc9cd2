use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::jsonc;
use crate::paths::ScopeResolver;
use crate::types::Scope;

use super::ConfigError;
use super::merge::{MergedConfig, ScopedConfig};

/// Reads and merges every present scope.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    resolver: ScopeResolver,
}

impl ConfigLoader {
    pub fn new(resolver: ScopeResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    /// Load one scope. `Ok(None)` when the scope has no source.
    pub fn load_scope(&self, scope: Scope) -> Result<Option<ScopedConfig>, ConfigError> {
        if scope == Scope::Remote {
            let Some(raw) = self.resolver.inline_config() else {
                return Ok(None);
            };
            let value = parse_document(&raw, scope, None)?;
            return Ok(Some(ScopedConfig {
                scope,
                value,
                raw: Some(raw),
                path: None,
            }));
        }

        let Some(path) = self.resolver.resolve(scope).config_file else {
            return Ok(None);
        };

        let Some(raw) = read_source(&path)? else {
            return Ok(None);
        };
        let value = parse_document(&raw, scope, Some(&path))?;

        Ok(Some(ScopedConfig {
            scope,
            value,
            raw: Some(raw),
            path: Some(path),
        }))
    }

    /// Like [`load_scope`](Self::load_scope) but absent scopes become an
    /// empty object.
    pub fn load_scope_or_empty(&self, scope: Scope) -> Result<ScopedConfig, ConfigError> {
        Ok(self
            .load_scope(scope)?
            .unwrap_or_else(|| ScopedConfig::empty(scope)))
    }

    /// Load and merge all scopes in precedence order.
    ///
    /// The first source that fails to parse aborts the load.
    pub fn load_all(&self) -> Result<MergedConfig, ConfigError> {
        let mut sources = Vec::new();

        for scope in Scope::ALL {
            match self.load_scope(scope)? {
                Some(source) => {
                    crate::debug_event!(
                        "engine",
                        "loaded",
                        "{scope} ({} keys){}",
                        source.value.len(),
                        source
                            .path
                            .as_ref()
                            .map(|p| format!(" from {}", p.display()))
                            .unwrap_or_default()
                    );
                    sources.push(source);
                }
                None => crate::debug_event!("engine", "absent", "{scope}"),
            }
        }

        Ok(MergedConfig::from_sources(sources))
    }
}

/// Read a source, treating a file that vanished since resolution as absent.
fn read_source(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::io(path, e)),
    }
}

/// Parse a comments-allowed document into an object.
///
/// Uses the same grammar as the editor, so anything that loads can also be
/// patched. Empty and comment-only documents are an empty object.
pub fn parse_document(
    text: &str,
    scope: Scope,
    path: Option<&Path>,
) -> Result<Map<String, Value>, ConfigError> {
    let document = jsonc::parse(text).map_err(|e| ConfigError::Parse {
        scope,
        path: path.map(PathBuf::from),
        message: e.to_string(),
    })?;

    match document.root.map(|root| root.to_value()) {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(ConfigError::NotAnObject {
            scope,
            path: path.map(PathBuf::from),
        }),
    }
}
