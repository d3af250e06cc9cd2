use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::ConfigWriter;
use crate::paths::{ScanDir, ScopeResolver};
use crate::types::Scope;

use super::{CatalogError, check_name, frontmatter, is_markdown, shadow, visible_entries};

const SKILL_FILE: &str = "SKILL.md";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillFrontmatter {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skill {
    pub frontmatter: SkillFrontmatter,
    pub body: String,
    pub path: PathBuf,
    pub scope: Scope,
}

impl Skill {
    pub fn name(&self) -> &str {
        &self.frontmatter.name
    }
}

/// Parse a skill document. Both `name` and `description` are required.
pub fn parse_skill_file(path: &Path, scope: Scope) -> Result<Skill, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (frontmatter, body): (SkillFrontmatter, String) =
        frontmatter::parse(&text).map_err(|source| CatalogError::Frontmatter {
            path: path.to_path_buf(),
            source,
        })?;

    for (field, value) in [("name", &frontmatter.name), ("description", &frontmatter.description)] {
        if value.trim().is_empty() {
            return Err(CatalogError::MissingField {
                path: path.to_path_buf(),
                field,
            });
        }
    }

    Ok(Skill {
        frontmatter,
        body,
        path: path.to_path_buf(),
        scope,
    })
}

/// Every skill visible from the resolver's scan directories.
pub fn list_skills(resolver: &ScopeResolver) -> Vec<Skill> {
    let mut skills = Vec::new();
    for dir in resolver.skill_scan_dirs() {
        scan_dir(&dir, &mut skills);
    }
    skills
}

fn scan_dir(dir: &ScanDir, skills: &mut Vec<Skill>) {
    if !dir.path.is_dir() {
        return;
    }

    for entry in visible_entries(&dir.path) {
        let candidate = if entry.is_dir() {
            entry.join(SKILL_FILE)
        } else if is_markdown(&entry) {
            entry
        } else {
            continue;
        };
        if !candidate.is_file() {
            continue;
        }

        match parse_skill_file(&candidate, dir.scope) {
            Ok(skill) => shadow(skills, skill, |s| s.name(), dir.scope),
            Err(e) => crate::debug_event!("catalog", "skipped", "{e}"),
        }
    }
}

/// Write `<dir>/<name>/SKILL.md`, returning its path.
pub fn write_skill(
    writer: &ConfigWriter,
    dir: &Path,
    frontmatter: &SkillFrontmatter,
    body: &str,
) -> Result<PathBuf, CatalogError> {
    check_name(&frontmatter.name)?;
    let path = dir.join(&frontmatter.name).join(SKILL_FILE);
    let text = frontmatter::render(frontmatter, body).map_err(|source| CatalogError::Frontmatter {
        path: path.clone(),
        source,
    })?;
    writer.write(&path, &text)?;
    Ok(path)
}
