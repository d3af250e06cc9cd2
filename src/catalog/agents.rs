use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::ConfigWriter;
use crate::paths::{ScanDir, ScopeResolver};
use crate::types::Scope;

use super::{CatalogError, check_name, frontmatter, is_markdown, shadow, visible_entries};

/// Agent frontmatter. Every field is optional; the name comes from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFrontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Agent {
    pub name: String,
    pub frontmatter: AgentFrontmatter,
    pub body: String,
    pub path: PathBuf,
    pub scope: Scope,
}

pub fn parse_agent_file(path: &Path, scope: Scope) -> Result<Agent, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (frontmatter, body): (AgentFrontmatter, String) = frontmatter::parse(&text).map_err(|source| CatalogError::Frontmatter {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Agent {
        name,
        frontmatter,
        body,
        path: path.to_path_buf(),
        scope,
    })
}

/// Every agent visible from the resolver's scan directories.
pub fn list_agents(resolver: &ScopeResolver) -> Vec<Agent> {
    let mut agents = Vec::new();
    for dir in resolver.agent_scan_dirs() {
        scan_dir(&dir, &mut agents);
    }
    agents
}

fn scan_dir(dir: &ScanDir, agents: &mut Vec<Agent>) {
    if !dir.path.is_dir() {
        return;
    }

    let entries = visible_entries(&dir.path)
        .into_iter()
        .filter(|path| is_markdown(path) && path.is_file());

    for path in entries {
        match parse_agent_file(&path, dir.scope) {
            Ok(agent) => shadow(agents, agent, |a| a.name.as_str(), dir.scope),
            Err(e) => crate::debug_event!("catalog", "skipped", "{e}"),
        }
    }
}

/// Write `<dir>/<name>.md`, returning its path.
pub fn write_agent(
    writer: &ConfigWriter,
    dir: &Path,
    name: &str,
    frontmatter: &AgentFrontmatter,
    body: &str,
) -> Result<PathBuf, CatalogError> {
    check_name(name)?;
    let path = dir.join(format!("{name}.md"));
    let text = frontmatter::render(frontmatter, body).map_err(|source| CatalogError::Frontmatter {
        path: path.clone(),
        source,
    })?;
    writer.write(&path, &text)?;
    Ok(path)
}
