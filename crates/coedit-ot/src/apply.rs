//! Reference applier: executes operations against a [`DataValue`] document.

use coedit_model::{get_mut, DataValue, ValueKind};
use thiserror::Error;

use crate::operation::{DiscreteOperation, Operation, OperationKind, TargetKind};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplyError {
    #[error("nothing found at {path}")]
    NotFound { path: String },
    #[error("{op} expects {expected:?} at {path}, found {found}")]
    KindMismatch {
        path: String,
        op: &'static str,
        expected: TargetKind,
        found: ValueKind,
    },
    #[error("index {index} out of bounds at {path} (length {len})")]
    IndexOutOfBounds { path: String, index: usize, len: usize },
    #[error("property {prop} not found at {path}")]
    MissingProperty { path: String, prop: String },
}

/// Apply `op` to `doc`.
///
/// No-op operations are skipped. A compound operation is applied in order
/// and atomically: if any sub-operation fails, `doc` is left unchanged.
pub fn apply(doc: &mut DataValue, op: &Operation) -> Result<(), ApplyError> {
    match op {
        Operation::Discrete(op) => apply_discrete(doc, op),
        Operation::Compound(compound) => {
            let mut scratch = doc.clone();
            for op in compound.ops() {
                apply_discrete(&mut scratch, op)?;
            }
            *doc = scratch;
            Ok(())
        }
    }
}

fn char_to_byte(s: &str, index: usize) -> Option<usize> {
    if index == s.chars().count() {
        return Some(s.len());
    }
    s.char_indices().nth(index).map(|(i, _)| i)
}

pub fn apply_discrete(doc: &mut DataValue, op: &DiscreteOperation) -> Result<(), ApplyError> {
    if op.no_op {
        return Ok(());
    }
    let path = || op.path.to_string();
    let target = get_mut(doc, &op.path).ok_or_else(|| ApplyError::NotFound { path: path() })?;
    let mismatch = |found: ValueKind| ApplyError::KindMismatch {
        path: path(),
        op: op.type_name(),
        expected: op.kind.target(),
        found,
    };
    let out_of_bounds = |index: usize, len: usize| ApplyError::IndexOutOfBounds {
        path: path(),
        index,
        len,
    };

    match (&op.kind, target) {
        (OperationKind::StringInsert { index, value }, DataValue::String(s)) => {
            let at = char_to_byte(s, *index).ok_or_else(|| out_of_bounds(*index, s.chars().count()))?;
            s.insert_str(at, value);
        }
        (OperationKind::StringRemove { index, value }, DataValue::String(s)) => {
            let len = s.chars().count();
            let end = index + value.chars().count();
            if end > len {
                return Err(out_of_bounds(end, len));
            }
            let kept: String = s
                .chars()
                .take(*index)
                .chain(s.chars().skip(end))
                .collect();
            *s = kept;
        }
        (OperationKind::StringSet { value }, target @ DataValue::String(_)) => {
            *target = DataValue::String(value.clone());
        }

        (OperationKind::ArrayInsert { index, value }, DataValue::Array(arr)) => {
            if *index > arr.len() {
                return Err(out_of_bounds(*index, arr.len()));
            }
            arr.insert(*index, value.clone());
        }
        (OperationKind::ArrayRemove { index }, DataValue::Array(arr)) => {
            if *index >= arr.len() {
                return Err(out_of_bounds(*index, arr.len()));
            }
            arr.remove(*index);
        }
        (OperationKind::ArrayReplace { index, value }, DataValue::Array(arr)) => {
            let len = arr.len();
            let slot = arr.get_mut(*index).ok_or_else(|| out_of_bounds(*index, len))?;
            *slot = value.clone();
        }
        (OperationKind::ArrayMove { from, to }, DataValue::Array(arr)) => {
            if *from >= arr.len() {
                return Err(out_of_bounds(*from, arr.len()));
            }
            if *to >= arr.len() {
                return Err(out_of_bounds(*to, arr.len()));
            }
            let item = arr.remove(*from);
            arr.insert(*to, item);
        }
        (OperationKind::ArraySet { value }, target @ DataValue::Array(_)) => {
            *target = DataValue::Array(value.clone());
        }

        (
            OperationKind::ObjectAddProperty { prop, value } | OperationKind::ObjectSetProperty { prop, value },
            DataValue::Object(map),
        ) => {
            map.insert(prop.clone(), value.clone());
        }
        (OperationKind::ObjectRemoveProperty { prop }, DataValue::Object(map)) => {
            if map.shift_remove(prop).is_none() {
                return Err(ApplyError::MissingProperty {
                    path: path(),
                    prop: prop.clone(),
                });
            }
        }
        (OperationKind::ObjectSet { value }, target @ DataValue::Object(_)) => {
            *target = DataValue::Object(value.clone());
        }

        (OperationKind::NumberDelta { delta }, DataValue::Number(n)) => *n += delta,
        (OperationKind::NumberSet { value }, DataValue::Number(n)) => *n = *value,
        (OperationKind::BooleanSet { value }, DataValue::Bool(b)) => *b = *value,
        (OperationKind::DateSet { value }, DataValue::Date(d)) => *d = *value,

        (_, other) => return Err(mismatch(other.kind())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::CompoundOperation;
    use coedit_model::path;
    use serde_json::json;

    fn doc() -> DataValue {
        DataValue::from(json!({"title": "héllo", "tags": ["a", "b", "c"], "n": 1, "done": false}))
    }

    #[test]
    fn string_edits_count_chars() {
        let mut doc = doc();
        apply_discrete(&mut doc, &DiscreteOperation::string_insert(path!["title"], 2, "X")).unwrap();
        apply_discrete(&mut doc, &DiscreteOperation::string_remove(path!["title"], 0, "hé")).unwrap();
        assert_eq!(doc.to_json()["title"], json!("Xllo"));
    }

    #[test]
    fn array_move_places_element_at_final_index() {
        let mut doc = doc();
        apply_discrete(&mut doc, &DiscreteOperation::array_move(path!["tags"], 0, 2)).unwrap();
        assert_eq!(doc.to_json()["tags"], json!(["b", "c", "a"]));
    }

    #[test]
    fn no_op_leaves_document_untouched() {
        let mut doc = doc();
        let before = doc.clone();
        let op = DiscreteOperation::array_remove(path!["tags"], 9).into_no_op();
        apply_discrete(&mut doc, &op).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let mut doc = doc();
        let err = apply_discrete(&mut doc, &DiscreteOperation::number_delta(path!["done"], 1.0)).unwrap_err();
        assert_eq!(
            err,
            ApplyError::KindMismatch {
                path: "/done".into(),
                op: "number_delta",
                expected: TargetKind::Number,
                found: ValueKind::Boolean,
            }
        );
    }

    #[test]
    fn compound_is_atomic() {
        let mut doc = doc();
        let before = doc.clone();
        let op = CompoundOperation::new(vec![
            DiscreteOperation::number_delta(path!["n"], 1.0),
            DiscreteOperation::array_remove(path!["tags"], 7),
        ])
        .unwrap();
        let err = apply(&mut doc, &op.into()).unwrap_err();
        assert_eq!(
            err,
            ApplyError::IndexOutOfBounds {
                path: "/tags".into(),
                index: 7,
                len: 3
            }
        );
        assert_eq!(doc, before);
    }

    #[test]
    fn removing_missing_property_fails() {
        let mut doc = doc();
        let err = apply_discrete(&mut doc, &DiscreteOperation::object_remove_property(path![], "ghost")).unwrap_err();
        assert!(matches!(err, ApplyError::MissingProperty { prop, .. } if prop == "ghost"));
    }
}
