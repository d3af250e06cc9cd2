//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module. Commands write JSON to
//! stdout and leave stderr to logging.

pub mod catalog;
pub mod edit;
pub mod inspect;
pub mod settings;
pub mod validate;
pub mod watch;

use serde::Serialize;

/// Pretty-print `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
