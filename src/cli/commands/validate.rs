//! Validate command.

use std::path::PathBuf;

use crate::config::Settings;
use crate::engine::ConfigLoader;
use crate::paths::ScopeResolver;
use crate::validation::{JsonSchemaValidator, SchemaValidator, ValidationResult};

use super::print_json;

/// Validate the merged configuration. Exits with status 1 when invalid.
pub fn run(resolver: &ScopeResolver, settings: &Settings, schema: Option<PathBuf>) -> anyhow::Result<()> {
    let merged = ConfigLoader::new(resolver.clone()).load_all()?;

    let result = match schema.or_else(|| settings.validation.schema.clone()) {
        Some(path) => JsonSchemaValidator::from_file(&path).validate(&merged.into_value()),
        None => ValidationResult::skipped("no schema configured; skipping validation"),
    };

    print_json(&result)?;
    if !result.valid {
        std::process::exit(1);
    }
    Ok(())
}
