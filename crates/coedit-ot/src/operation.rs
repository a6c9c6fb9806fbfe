//! Operation model.
//!
//! A [`DiscreteOperation`] is one structural mutation addressed by a
//! [`Path`]. For container operations (string, array, object) the path names
//! the container and the payload carries the index or property. A
//! [`CompoundOperation`] groups discrete operations that are transformed and
//! applied as a single causal unit.
//!
//! Operations are immutable values: transformation always builds new
//! instances through [`DiscreteOperation::with_path`],
//! [`DiscreteOperation::with_kind`] and [`DiscreteOperation::into_no_op`].

use chrono::{DateTime, Utc};
use coedit_model::{DataValue, ObjectMap, Path};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("compound operation must contain at least one operation")]
    EmptyCompound,
}

/// The mutation performed by a [`DiscreteOperation`].
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    // ── String ────────────────────────────────────────────────────────────
    StringInsert { index: usize, value: String },
    /// `value` is the removed text; its char count is the removed length.
    StringRemove { index: usize, value: String },
    StringSet { value: String },

    // ── Array ─────────────────────────────────────────────────────────────
    ArrayInsert { index: usize, value: DataValue },
    ArrayRemove { index: usize },
    ArrayReplace { index: usize, value: DataValue },
    /// Removes the element at `from` and reinserts it so that it ends up at
    /// index `to`.
    ArrayMove { from: usize, to: usize },
    ArraySet { value: Vec<DataValue> },

    // ── Object ────────────────────────────────────────────────────────────
    ObjectAddProperty { prop: String, value: DataValue },
    ObjectSetProperty { prop: String, value: DataValue },
    ObjectRemoveProperty { prop: String },
    ObjectSet { value: ObjectMap },

    // ── Scalars ───────────────────────────────────────────────────────────
    NumberDelta { delta: f64 },
    NumberSet { value: f64 },
    BooleanSet { value: bool },
    DateSet { value: DateTime<Utc> },
}

/// Which family of node an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    String,
    Array,
    Object,
    Number,
    Boolean,
    Date,
}

impl OperationKind {
    /// Wire tag of the operation.
    pub fn type_name(&self) -> &'static str {
        match self {
            OperationKind::StringInsert { .. } => "string_insert",
            OperationKind::StringRemove { .. } => "string_remove",
            OperationKind::StringSet { .. } => "string_set",
            OperationKind::ArrayInsert { .. } => "array_insert",
            OperationKind::ArrayRemove { .. } => "array_remove",
            OperationKind::ArrayReplace { .. } => "array_replace",
            OperationKind::ArrayMove { .. } => "array_move",
            OperationKind::ArraySet { .. } => "array_set",
            OperationKind::ObjectAddProperty { .. } => "object_add_property",
            OperationKind::ObjectSetProperty { .. } => "object_set_property",
            OperationKind::ObjectRemoveProperty { .. } => "object_remove_property",
            OperationKind::ObjectSet { .. } => "object_set",
            OperationKind::NumberDelta { .. } => "number_delta",
            OperationKind::NumberSet { .. } => "number_set",
            OperationKind::BooleanSet { .. } => "boolean_set",
            OperationKind::DateSet { .. } => "date_set",
        }
    }

    pub fn target(&self) -> TargetKind {
        match self {
            OperationKind::StringInsert { .. }
            | OperationKind::StringRemove { .. }
            | OperationKind::StringSet { .. } => TargetKind::String,
            OperationKind::ArrayInsert { .. }
            | OperationKind::ArrayRemove { .. }
            | OperationKind::ArrayReplace { .. }
            | OperationKind::ArrayMove { .. }
            | OperationKind::ArraySet { .. } => TargetKind::Array,
            OperationKind::ObjectAddProperty { .. }
            | OperationKind::ObjectSetProperty { .. }
            | OperationKind::ObjectRemoveProperty { .. }
            | OperationKind::ObjectSet { .. } => TargetKind::Object,
            OperationKind::NumberDelta { .. } | OperationKind::NumberSet { .. } => {
                TargetKind::Number
            }
            OperationKind::BooleanSet { .. } => TargetKind::Boolean,
            OperationKind::DateSet { .. } => TargetKind::Date,
        }
    }

    /// True for operations that replace the whole node they address.
    pub fn is_set(&self) -> bool {
        matches!(
            self,
            OperationKind::StringSet { .. }
                | OperationKind::ArraySet { .. }
                | OperationKind::ObjectSet { .. }
                | OperationKind::NumberSet { .. }
                | OperationKind::BooleanSet { .. }
                | OperationKind::DateSet { .. }
        )
    }
}

/// A single mutation of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteOperation {
    pub path: Path,
    /// Set by transformation when the operation no longer has any effect.
    pub no_op: bool,
    pub kind: OperationKind,
}

impl DiscreteOperation {
    pub fn new(path: Path, kind: OperationKind) -> Self {
        Self {
            path,
            no_op: false,
            kind,
        }
    }

    pub fn string_insert(path: Path, index: usize, value: impl Into<String>) -> Self {
        Self::new(path, OperationKind::StringInsert { index, value: value.into() })
    }

    pub fn string_remove(path: Path, index: usize, value: impl Into<String>) -> Self {
        Self::new(path, OperationKind::StringRemove { index, value: value.into() })
    }

    pub fn string_set(path: Path, value: impl Into<String>) -> Self {
        Self::new(path, OperationKind::StringSet { value: value.into() })
    }

    pub fn array_insert(path: Path, index: usize, value: impl Into<DataValue>) -> Self {
        Self::new(path, OperationKind::ArrayInsert { index, value: value.into() })
    }

    pub fn array_remove(path: Path, index: usize) -> Self {
        Self::new(path, OperationKind::ArrayRemove { index })
    }

    pub fn array_replace(path: Path, index: usize, value: impl Into<DataValue>) -> Self {
        Self::new(path, OperationKind::ArrayReplace { index, value: value.into() })
    }

    pub fn array_move(path: Path, from: usize, to: usize) -> Self {
        Self::new(path, OperationKind::ArrayMove { from, to })
    }

    pub fn array_set(path: Path, value: Vec<DataValue>) -> Self {
        Self::new(path, OperationKind::ArraySet { value })
    }

    pub fn object_add_property(path: Path, prop: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::new(path, OperationKind::ObjectAddProperty { prop: prop.into(), value: value.into() })
    }

    pub fn object_set_property(path: Path, prop: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::new(path, OperationKind::ObjectSetProperty { prop: prop.into(), value: value.into() })
    }

    pub fn object_remove_property(path: Path, prop: impl Into<String>) -> Self {
        Self::new(path, OperationKind::ObjectRemoveProperty { prop: prop.into() })
    }

    pub fn object_set(path: Path, value: ObjectMap) -> Self {
        Self::new(path, OperationKind::ObjectSet { value })
    }

    pub fn number_delta(path: Path, delta: f64) -> Self {
        Self::new(path, OperationKind::NumberDelta { delta })
    }

    pub fn number_set(path: Path, value: f64) -> Self {
        Self::new(path, OperationKind::NumberSet { value })
    }

    pub fn boolean_set(path: Path, value: bool) -> Self {
        Self::new(path, OperationKind::BooleanSet { value })
    }

    pub fn date_set(path: Path, value: DateTime<Utc>) -> Self {
        Self::new(path, OperationKind::DateSet { value })
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Returns a copy addressing `path`.
    pub fn with_path(&self, path: Path) -> Self {
        Self {
            path,
            no_op: self.no_op,
            kind: self.kind.clone(),
        }
    }

    /// Returns a copy with a different payload at the same path.
    pub fn with_kind(&self, kind: OperationKind) -> Self {
        Self {
            path: self.path.clone(),
            no_op: self.no_op,
            kind,
        }
    }

    /// Returns a copy marked as having no remaining effect.
    pub fn into_no_op(self) -> Self {
        Self { no_op: true, ..self }
    }
}

/// Ordered, non-empty batch of discrete operations.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundOperation {
    ops: Vec<DiscreteOperation>,
}

impl CompoundOperation {
    pub fn new(ops: Vec<DiscreteOperation>) -> Result<Self, OperationError> {
        if ops.is_empty() {
            return Err(OperationError::EmptyCompound);
        }
        Ok(Self { ops })
    }

    /// Rebuilds a compound from the transformed forms of its sub-operations,
    /// which are never fewer than the originals.
    pub(crate) fn from_transformed(ops: Vec<DiscreteOperation>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[DiscreteOperation] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DiscreteOperation> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// True when every sub-operation has been reduced to a no-op.
    pub fn is_no_op(&self) -> bool {
        self.ops.iter().all(|op| op.no_op)
    }
}

/// Either a single operation or an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Discrete(DiscreteOperation),
    Compound(CompoundOperation),
}

impl Operation {
    pub fn type_name(&self) -> &'static str {
        match self {
            Operation::Discrete(op) => op.type_name(),
            Operation::Compound(_) => "compound",
        }
    }

    pub fn is_no_op(&self) -> bool {
        match self {
            Operation::Discrete(op) => op.no_op,
            Operation::Compound(op) => op.is_no_op(),
        }
    }

    /// The discrete operations in application order.
    pub fn discrete_ops(&self) -> &[DiscreteOperation] {
        match self {
            Operation::Discrete(op) => std::slice::from_ref(op),
            Operation::Compound(op) => op.ops(),
        }
    }

    pub fn as_discrete(&self) -> Option<&DiscreteOperation> {
        match self {
            Operation::Discrete(op) => Some(op),
            Operation::Compound(_) => None,
        }
    }
}

impl From<DiscreteOperation> for Operation {
    fn from(op: DiscreteOperation) -> Self {
        Operation::Discrete(op)
    }
}

impl From<CompoundOperation> for Operation {
    fn from(op: CompoundOperation) -> Self {
        Operation::Compound(op)
    }
}
