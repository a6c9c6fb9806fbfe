//! Rewriting descendant paths after an ancestor operation.
//!
//! When one operation edits a container and another addresses something
//! inside it, the inner operation's path may have to shift (an element was
//! inserted or removed before it) or may no longer point at anything (its
//! subtree was removed or replaced).

use coedit_model::Path;

use crate::operation::{DiscreteOperation, OperationKind};
use crate::transform::array::moved_index;

/// Outcome of [`transform_descendant_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTransformation {
    NoTransformation,
    PathUpdated(Path),
    PathObsoleted,
}

/// Transform `descendant` to account for `ancestor` having been applied.
///
/// Only applies when `ancestor.path` is a strict prefix of `descendant`;
/// any other pair yields [`PathTransformation::NoTransformation`]. Table
/// cells are compared as their two indices, so an edit of row `r` reaches
/// `(r, c)` and an updated path keeps the descendant's cell notation.
pub fn transform_descendant_path(ancestor: &DiscreteOperation, descendant: &Path) -> PathTransformation {
    let ancestor = ancestor.with_path(ancestor.path.expanded());
    match transform_expanded(&ancestor, &descendant.expanded()) {
        PathTransformation::PathUpdated(path) => PathTransformation::PathUpdated(path.packed_like(descendant)),
        other => other,
    }
}

/// [`transform_descendant_path`] for paths without table cells.
pub(crate) fn transform_expanded(ancestor: &DiscreteOperation, descendant: &Path) -> PathTransformation {
    if !ancestor.path.is_ancestor_of(descendant) {
        return PathTransformation::NoTransformation;
    }
    let depth = ancestor.path.len();
    let Some(element) = descendant.get(depth) else {
        return PathTransformation::NoTransformation;
    };

    match &ancestor.kind {
        OperationKind::ArrayInsert { index, .. } => match element.array_index() {
            Some(i) if i >= *index => updated(descendant, depth, element.with_array_index(i + 1)),
            _ => PathTransformation::NoTransformation,
        },
        OperationKind::ArrayRemove { index } => match element.array_index() {
            Some(i) if i == *index => PathTransformation::PathObsoleted,
            Some(i) if i > *index => updated(descendant, depth, element.with_array_index(i - 1)),
            _ => PathTransformation::NoTransformation,
        },
        OperationKind::ArrayReplace { index, .. } => match element.array_index() {
            Some(i) if i == *index => PathTransformation::PathObsoleted,
            _ => PathTransformation::NoTransformation,
        },
        OperationKind::ArrayMove { from, to } => match element.array_index() {
            Some(i) => {
                let j = moved_index(*from, *to, i);
                if j == i {
                    PathTransformation::NoTransformation
                } else {
                    updated(descendant, depth, element.with_array_index(j))
                }
            }
            None => PathTransformation::NoTransformation,
        },
        OperationKind::ArraySet { .. } | OperationKind::ObjectSet { .. } => {
            PathTransformation::PathObsoleted
        }
        OperationKind::ObjectAddProperty { prop, .. }
        | OperationKind::ObjectSetProperty { prop, .. }
        | OperationKind::ObjectRemoveProperty { prop } => {
            if element.as_key() == Some(prop.as_str()) {
                PathTransformation::PathObsoleted
            } else {
                PathTransformation::NoTransformation
            }
        }
        // Scalars have no descendants.
        OperationKind::StringInsert { .. }
        | OperationKind::StringRemove { .. }
        | OperationKind::StringSet { .. }
        | OperationKind::NumberDelta { .. }
        | OperationKind::NumberSet { .. }
        | OperationKind::BooleanSet { .. }
        | OperationKind::DateSet { .. } => PathTransformation::NoTransformation,
    }
}

fn updated(path: &Path, depth: usize, element: coedit_model::PathElement) -> PathTransformation {
    PathTransformation::PathUpdated(path.with_element(depth, element))
}

/// Apply a path transformation result to `op`.
pub(crate) fn apply_path_transformation(op: &DiscreteOperation, result: PathTransformation) -> DiscreteOperation {
    match result {
        PathTransformation::NoTransformation => op.clone(),
        PathTransformation::PathUpdated(path) => op.with_path(path),
        PathTransformation::PathObsoleted => op.clone().into_no_op(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coedit_model::{path, DataValue, ObjectMap};

    #[test]
    fn array_insert_bumps_later_indices() {
        let ins = DiscreteOperation::array_insert(path!["list"], 1, "x");
        assert_eq!(
            transform_descendant_path(&ins, &path!["list", 1, "name"]),
            PathTransformation::PathUpdated(path!["list", 2, "name"])
        );
        assert_eq!(
            transform_descendant_path(&ins, &path!["list", 0, "name"]),
            PathTransformation::NoTransformation
        );
    }

    #[test]
    fn array_remove_lowers_or_obsoletes() {
        let rem = DiscreteOperation::array_remove(path!["list"], 2);
        assert_eq!(
            transform_descendant_path(&rem, &path!["list", 2, "x"]),
            PathTransformation::PathObsoleted
        );
        assert_eq!(
            transform_descendant_path(&rem, &path!["list", 5]),
            PathTransformation::PathUpdated(path!["list", 4])
        );
        // The unchanged cases keep the descendant path as given.
        assert_eq!(
            transform_descendant_path(&rem, &path!["list", 1]),
            PathTransformation::NoTransformation
        );
    }

    #[test]
    fn whole_container_set_obsoletes_every_descendant() {
        let set = DiscreteOperation::object_set(path!["cfg"], ObjectMap::new());
        assert_eq!(
            transform_descendant_path(&set, &path!["cfg", "a", 0]),
            PathTransformation::PathObsoleted
        );
        let set = DiscreteOperation::array_set(path![], vec![DataValue::Null]);
        assert_eq!(
            transform_descendant_path(&set, &path![0]),
            PathTransformation::PathObsoleted
        );
    }

    #[test]
    fn set_property_obsoletes_only_its_key() {
        let set = DiscreteOperation::object_set_property(path![], "x", 1.0);
        assert_eq!(
            transform_descendant_path(&set, &path!["x", "deep"]),
            PathTransformation::PathObsoleted
        );
        assert_eq!(
            transform_descendant_path(&set, &path!["y", "deep"]),
            PathTransformation::NoTransformation
        );
    }

    #[test]
    fn move_remaps_indices() {
        let mv = DiscreteOperation::array_move(path!["l"], 0, 2);
        assert_eq!(
            transform_descendant_path(&mv, &path!["l", 0]),
            PathTransformation::PathUpdated(path!["l", 2])
        );
        assert_eq!(
            transform_descendant_path(&mv, &path!["l", 2]),
            PathTransformation::PathUpdated(path!["l", 1])
        );
        assert_eq!(
            transform_descendant_path(&mv, &path!["l", 3]),
            PathTransformation::NoTransformation
        );
    }

    #[test]
    fn table_rows_shift_like_indices() {
        let ins = DiscreteOperation::array_insert(path!["grid"], 0, DataValue::Array(vec![]));
        assert_eq!(
            transform_descendant_path(&ins, &path!["grid", (1, 3)]),
            PathTransformation::PathUpdated(path!["grid", (2, 3)])
        );
    }

    #[test]
    fn unrelated_and_equal_paths_are_untouched() {
        let rem = DiscreteOperation::array_remove(path!["a"], 0);
        assert_eq!(
            transform_descendant_path(&rem, &path!["b", 0]),
            PathTransformation::NoTransformation
        );
        assert_eq!(
            transform_descendant_path(&rem, &path!["a"]),
            PathTransformation::NoTransformation
        );
    }
}
