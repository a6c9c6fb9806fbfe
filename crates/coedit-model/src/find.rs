//! Path lookup.

use crate::{DataValue, Path, PathElement, PathError};

/// A resolved location in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference<'a> {
    /// The target value, if present.
    pub val: Option<&'a DataValue>,
    /// The container holding the target. `None` for the root.
    pub container: Option<&'a DataValue>,
    /// The element of the container that selects the target.
    pub element: Option<&'a PathElement>,
}

impl Reference<'_> {
    pub fn is_array_reference(&self) -> bool {
        matches!(self.container, Some(DataValue::Array(_)))
    }

    pub fn is_object_reference(&self) -> bool {
        matches!(self.container, Some(DataValue::Object(_)))
    }

    /// True if the reference points one past the last array element.
    pub fn is_array_end(&self) -> bool {
        match (self.container, self.element) {
            (Some(DataValue::Array(arr)), Some(PathElement::Index(i))) => *i == arr.len(),
            _ => false,
        }
    }
}

fn step<'a>(current: &'a DataValue, element: &PathElement) -> Option<&'a DataValue> {
    match (current, element) {
        (DataValue::Object(map), PathElement::Key(k)) => map.get(k),
        (DataValue::Array(arr), PathElement::Index(i)) => arr.get(*i),
        (DataValue::Array(arr), PathElement::Table(row, col)) => match arr.get(*row)? {
            DataValue::Array(cells) => cells.get(*col),
            _ => None,
        },
        _ => None,
    }
}

fn step_mut<'a>(current: &'a mut DataValue, element: &PathElement) -> Option<&'a mut DataValue> {
    match (current, element) {
        (DataValue::Object(map), PathElement::Key(k)) => map.get_mut(k),
        (DataValue::Array(arr), PathElement::Index(i)) => arr.get_mut(*i),
        (DataValue::Array(arr), PathElement::Table(row, col)) => match arr.get_mut(*row)? {
            DataValue::Array(cells) => cells.get_mut(*col),
            _ => None,
        },
        _ => None,
    }
}

/// Get a value by path. Returns `None` if any step does not resolve.
pub fn get<'a>(doc: &'a DataValue, path: &Path) -> Option<&'a DataValue> {
    let mut current = doc;
    for element in path {
        current = step(current, element)?;
    }
    Some(current)
}

/// Get a mutable reference to a value by path.
pub fn get_mut<'a>(doc: &'a mut DataValue, path: &Path) -> Option<&'a mut DataValue> {
    let mut current = doc;
    for element in path {
        current = step_mut(current, element)?;
    }
    Some(current)
}

/// Resolve `path` to a [`Reference`].
///
/// Every container on the way must exist; only the final element may be
/// missing, in which case `val` is `None`.
pub fn find<'a>(doc: &'a DataValue, path: &'a Path) -> Result<Reference<'a>, PathError> {
    let Some((last, parents)) = path.elements().split_last() else {
        return Ok(Reference {
            val: Some(doc),
            container: None,
            element: None,
        });
    };

    let mut container = doc;
    for (depth, element) in parents.iter().enumerate() {
        container = step(container, element).ok_or(PathError::NotFound { depth })?;
    }
    match (container, last) {
        (DataValue::Object(_), PathElement::Key(_))
        | (DataValue::Array(_), PathElement::Index(_) | PathElement::Table(..)) => {}
        _ => {
            return Err(PathError::KindMismatch {
                depth: parents.len(),
                element: last.to_string(),
                kind: container.kind(),
            })
        }
    }
    Ok(Reference {
        val: step(container, last),
        container: Some(container),
        element: Some(last),
    })
}
