//! Comment-preserving JSONC editing.
//!
//! Config files are maintained by hand, so edits must not re-serialize the
//! whole document. [`parse`] builds a tree with byte spans for every node;
//! the edit functions turn a requested change into byte-range replacements
//! against the original text.
//!
//! ```text
//! text ──parse──▶ span tree ──plan──▶ [Edit] ──apply_edits──▶ text'
//! ```

mod edit;
mod parse;

pub use edit::{Edit, apply_edits, remove_value, replace_root, set_value, skeleton, to_pretty};
pub use parse::{Document, Element, Node, NodeKind, Property, line_indent, parse};

use thiserror::Error;

use crate::types::KeyPath;

#[derive(Error, Debug)]
pub enum JsoncError {
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("cannot descend into '{path}': parent is not a matching container")]
    PathConflict { path: KeyPath },

    #[error("index {index} out of range at '{path}' (length {len})")]
    IndexOutOfRange {
        path: KeyPath,
        index: usize,
        len: usize,
    },

    #[error("cannot serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}
