use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ranked configuration source.
///
/// Variant order is merge precedence: later scopes override earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    Managed,
    Global,
    Custom,
    Remote,
    Project,
    ProjectDir,
}

impl Scope {
    /// All scopes in merge precedence order.
    pub const ALL: [Scope; 6] = [
        Scope::Managed,
        Scope::Global,
        Scope::Custom,
        Scope::Remote,
        Scope::Project,
        Scope::ProjectDir,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Managed => "managed",
            Scope::Global => "global",
            Scope::Custom => "custom",
            Scope::Remote => "remote",
            Scope::Project => "project",
            Scope::ProjectDir => "projectDir",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "managed" => Ok(Scope::Managed),
            "global" => Ok(Scope::Global),
            "custom" => Ok(Scope::Custom),
            "remote" => Ok(Scope::Remote),
            "project" => Ok(Scope::Project),
            "projectDir" | "project-dir" | "projectdir" => Ok(Scope::ProjectDir),
            other => Err(format!(
                "unknown scope '{other}' (expected one of: managed, global, custom, remote, project, projectDir)"
            )),
        }
    }
}

/// One step in a path into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Ordered path of keys and indices, e.g. `tui.theme` or `instructions.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath(Vec<PathSegment>);

impl KeyPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Parse a dotted path. Purely numeric segments become indices.
    pub fn parse_dotted(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self(
            path.split('.')
                .map(|part| match part.parse::<usize>() {
                    Ok(index) => PathSegment::Index(index),
                    Err(_) => PathSegment::Key(part.to_string()),
                })
                .collect(),
        )
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for KeyPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// What kind of source produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeCategory {
    Config,
    Skill,
    Agent,
}

impl ChangeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Skill => "skill",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only modifications are distinguishable from the raw signals we get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Modified,
}

/// Normalized notification for an externally caused change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub category: ChangeCategory,
    pub scope: Scope,
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn modified(category: ChangeCategory, scope: Scope, path: PathBuf) -> Self {
        Self {
            category,
            scope,
            path,
            kind: ChangeKind::Modified,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_order_matches_precedence() {
        let mut sorted = Scope::ALL;
        sorted.sort();
        assert_eq!(sorted, Scope::ALL);
        assert!(Scope::Managed < Scope::Global);
        assert!(Scope::Project < Scope::ProjectDir);
    }

    #[test]
    fn test_scope_round_trips_through_str() {
        for scope in Scope::ALL {
            assert_eq!(scope.as_str().parse::<Scope>().unwrap(), scope);
        }
        assert!("nowhere".parse::<Scope>().is_err());
    }

    #[test]
    fn test_change_event_json_shape() {
        let event = ChangeEvent::modified(
            ChangeCategory::Skill,
            Scope::ProjectDir,
            PathBuf::from("/repo/.opencode/skills/notes.md"),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "skill");
        assert_eq!(json["scope"], "projectDir");
        assert_eq!(json["kind"], "modified");
        assert!(json["timestamp"].as_str().is_some_and(|t| t.ends_with('Z')));

        let back: ChangeEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_scope_serializes_camel_case() {
        let json = serde_json::to_string(&Scope::ProjectDir).unwrap();
        assert_eq!(json, "\"projectDir\"");
    }

    #[test]
    fn test_dotted_key_path() {
        let path = KeyPath::parse_dotted("mcp.servers.0.url");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("mcp".into()),
                PathSegment::Key("servers".into()),
                PathSegment::Index(0),
                PathSegment::Key("url".into()),
            ]
        );
        assert_eq!(path.to_string(), "mcp.servers.0.url");
        assert!(KeyPath::parse_dotted("").is_root());
    }

    #[test]
    fn test_change_event_serializes_for_front_ends() {
        let event = ChangeEvent::modified(
            ChangeCategory::Config,
            Scope::Global,
            PathBuf::from("/home/u/.config/opencode/opencode.jsonc"),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "config");
        assert_eq!(json["scope"], "global");
        assert_eq!(json["kind"], "modified");
        assert!(json["timestamp"].is_string());
    }
}
