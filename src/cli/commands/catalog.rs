//! Skill and agent listings.

use crate::catalog::{list_agents, list_skills};
use crate::paths::ScopeResolver;

use super::print_json;

pub fn run_skills(resolver: &ScopeResolver) -> anyhow::Result<()> {
    print_json(&list_skills(resolver))
}

pub fn run_agents(resolver: &ScopeResolver) -> anyhow::Result<()> {
    print_json(&list_agents(resolver))
}
