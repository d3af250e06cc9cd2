//! Command-line interface for opconf.
//!
//! Provides argument parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};

use crate::config::Settings;
use crate::paths::ScopeResolver;

/// Run a parsed command against the live process environment.
pub async fn dispatch(command: Commands, settings: &Settings) -> anyhow::Result<()> {
    let resolver = ScopeResolver::from_process();

    match command {
        Commands::Paths => commands::inspect::run_paths(&resolver),
        Commands::Show { scope, sources } => commands::inspect::run_show(&resolver, scope, sources),
        Commands::Get { key } => commands::inspect::run_get(&resolver, &key),
        Commands::Set { scope, key, value } => commands::edit::run_set(&resolver, scope, &key, &value),
        Commands::Unset { scope, key } => commands::edit::run_unset(&resolver, scope, &key),
        Commands::Replace { scope, file } => commands::edit::run_replace(&resolver, scope, &file),
        Commands::Watch { debounce_ms } => commands::watch::run(&resolver, settings, debounce_ms).await,
        Commands::Skills => commands::catalog::run_skills(&resolver),
        Commands::Agents => commands::catalog::run_agents(&resolver),
        Commands::Validate { schema } => commands::validate::run(&resolver, settings, schema),
        Commands::Config => {
            commands::settings::run_config(settings);
            Ok(())
        }
    }
}
