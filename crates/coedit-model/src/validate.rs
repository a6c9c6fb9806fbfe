//! Structural validation of paths against a document.

use crate::{DataValue, Path, PathElement, PathError};

/// Maximum allowed path depth.
pub const MAX_PATH_LENGTH: usize = 256;

/// Check that every element of `path` matches the kind of the container it
/// indexes into: keys under objects, indices and table cells under arrays.
///
/// The final element may address a missing slot (a property about to be
/// added, or one past the end of an array); intermediate elements must exist.
pub fn validate_path(doc: &DataValue, path: &Path) -> Result<(), PathError> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(PathError::PathTooLong);
    }
    let mut current = Some(doc);
    for (depth, element) in path.iter().enumerate() {
        let container = current.ok_or(PathError::NotFound { depth })?;
        current = match (container, element) {
            (DataValue::Object(map), PathElement::Key(k)) => map.get(k),
            (DataValue::Array(arr), PathElement::Index(i)) => {
                if *i > arr.len() {
                    return Err(PathError::IndexOutOfBounds { depth, index: *i });
                }
                arr.get(*i)
            }
            (DataValue::Array(arr), PathElement::Table(row, col)) => {
                match arr.get(*row) {
                    Some(DataValue::Array(cells)) => cells.get(*col),
                    Some(other) => {
                        return Err(PathError::KindMismatch {
                            depth,
                            element: element.to_string(),
                            kind: other.kind(),
                        })
                    }
                    None => return Err(PathError::IndexOutOfBounds { depth, index: *row }),
                }
            }
            _ => {
                return Err(PathError::KindMismatch {
                    depth,
                    element: element.to_string(),
                    kind: container.kind(),
                })
            }
        };
    }
    Ok(())
}
