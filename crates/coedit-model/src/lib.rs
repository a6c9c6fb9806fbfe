//! Document values and structural paths.
//!
//! A collaborative document is a tree of [`DataValue`]s. Every edit names
//! its target with a [`Path`] of keys (objects), indices (arrays) and
//! `(row, col)` cells (arrays of arrays).
//!
//! # Example
//!
//! ```
//! use coedit_model::{get, path, DataValue};
//! use serde_json::json;
//!
//! let doc = DataValue::from(json!({"todo": [{"title": "milk"}]}));
//! let title = get(&doc, &path!["todo", 0, "title"]);
//! assert_eq!(title, Some(&DataValue::from("milk")));
//! ```

use thiserror::Error;

pub mod find;
pub mod path;
pub mod validate;
pub mod value;

pub use find::{find, get, get_mut, Reference};
pub use path::{escape_key, Path, PathElement};
pub use validate::{validate_path, MAX_PATH_LENGTH};
pub use value::{DataValue, ObjectMap, ValueKind, DATE_KEY};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path has no parent")]
    NoParent,
    #[error("nothing found at depth {depth}")]
    NotFound { depth: usize },
    #[error("element {element} at depth {depth} cannot index into {kind}")]
    KindMismatch {
        depth: usize,
        element: String,
        kind: ValueKind,
    },
    #[error("index {index} at depth {depth} is out of bounds")]
    IndexOutOfBounds { depth: usize, index: usize },
    #[error("path too long")]
    PathTooLong,
}
