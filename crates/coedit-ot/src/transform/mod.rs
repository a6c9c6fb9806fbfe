//! Operational transformation of concurrent operations.
//!
//! `transform(server, client)` returns `(server', client')` such that
//! applying `server` then `client'` yields the same document as applying
//! `client` then `server'`.
//!
//! Pairs addressing the same node go through the per-family rules in
//! [`string`], [`array`], [`object`] and [`scalar`]. Pairs where one path is
//! an ancestor of the other go through the path transformer. Pairs on
//! unrelated paths pass through unchanged.

pub mod array;
pub mod object;
pub mod scalar;
pub mod string;

use thiserror::Error;
use tracing::trace;

use crate::config::{Priority, TransformConfig};
use crate::operation::{CompoundOperation, DiscreteOperation, Operation, TargetKind};
use crate::path_transform::{apply_path_transformation, transform_expanded};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("unsupported operation pair at {path}: server {server}, client {client}")]
    UnsupportedOperationPair {
        path: String,
        server: &'static str,
        client: &'static str,
    },
}

/// Result of transforming two discrete operations: `(server', client')`.
pub type DiscretePair = (DiscreteOperation, DiscreteOperation);

pub(crate) fn unsupported(s: &DiscreteOperation, c: &DiscreteOperation) -> TransformError {
    TransformError::UnsupportedOperationPair {
        path: s.path.to_string(),
        server: s.type_name(),
        client: c.type_name(),
    }
}

/// Two whole-node sets of the same node: the priority side survives.
pub(crate) fn set_set(s: &DiscreteOperation, c: &DiscreteOperation, server_wins: bool) -> DiscretePair {
    if server_wins {
        (s.clone(), c.clone().into_no_op())
    } else {
        (s.clone().into_no_op(), c.clone())
    }
}

/// The transform registry.
///
/// Holds the tie-break policy; build it once and share it (e.g. behind an
/// `Arc`) between the concurrency controls of every open document.
#[derive(Debug, Clone, Default)]
pub struct OperationTransformer {
    priority: Priority,
}

impl OperationTransformer {
    pub fn new(config: &TransformConfig) -> Self {
        Self {
            priority: config.priority,
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    fn server_wins(&self) -> bool {
        self.priority == Priority::Server
    }

    /// Transform a server operation against a concurrent client operation.
    pub fn transform(&self, server: &Operation, client: &Operation) -> Result<(Operation, Operation), TransformError> {
        match server {
            Operation::Discrete(s) => {
                let (s, c) = self.discrete_against(s, client)?;
                Ok((Operation::Discrete(s), c))
            }
            Operation::Compound(compound) => {
                let mut client = client.clone();
                let mut ops = Vec::with_capacity(compound.len());
                for s in compound.ops() {
                    let (s, c) = self.discrete_against(s, &client)?;
                    ops.push(s);
                    client = c;
                }
                Ok((Operation::Compound(CompoundOperation::from_transformed(ops)), client))
            }
        }
    }

    fn discrete_against(&self, s: &DiscreteOperation, client: &Operation) -> Result<(DiscreteOperation, Operation), TransformError> {
        match client {
            Operation::Discrete(c) => {
                let (s, c) = self.transform_discrete(s, c)?;
                Ok((s, Operation::Discrete(c)))
            }
            Operation::Compound(compound) => {
                let mut s = s.clone();
                let mut ops = Vec::with_capacity(compound.len());
                for c in compound.ops() {
                    let (next_s, c) = self.transform_discrete(&s, c)?;
                    ops.push(c);
                    s = next_s;
                }
                Ok((s, Operation::Compound(CompoundOperation::from_transformed(ops))))
            }
        }
    }

    /// Transform two discrete operations.
    ///
    /// Paths are related with table cells spelled as two indices; the
    /// results keep the notation each operation came in with.
    pub fn transform_discrete(&self, s: &DiscreteOperation, c: &DiscreteOperation) -> Result<DiscretePair, TransformError> {
        if s.no_op || c.no_op {
            return Ok((s.clone(), c.clone()));
        }
        trace!(
            server = s.type_name(),
            client = c.type_name(),
            server_path = %s.path,
            client_path = %c.path,
            "transform"
        );

        let (s2, c2) = self.transform_cells_expanded(&s.with_path(s.path.expanded()), &c.with_path(c.path.expanded()))?;
        let s2 = s2.with_path(s2.path.packed_like(&s.path));
        let c2 = c2.with_path(c2.path.packed_like(&c.path));
        Ok((s2, c2))
    }

    fn transform_cells_expanded(&self, s: &DiscreteOperation, c: &DiscreteOperation) -> Result<DiscretePair, TransformError> {
        if s.path == c.path {
            return self.transform_same_node(s, c);
        }
        if s.path.is_ancestor_of(&c.path) {
            let c = apply_path_transformation(c, transform_expanded(s, &c.path));
            return Ok((s.clone(), c));
        }
        if c.path.is_ancestor_of(&s.path) {
            let s = apply_path_transformation(s, transform_expanded(c, &s.path));
            return Ok((s, c.clone()));
        }
        Ok((s.clone(), c.clone()))
    }

    fn transform_same_node(&self, s: &DiscreteOperation, c: &DiscreteOperation) -> Result<DiscretePair, TransformError> {
        let server_wins = self.server_wins();
        match (s.kind.target(), c.kind.target()) {
            (TargetKind::String, TargetKind::String) => string::transform(s, c, server_wins),
            (TargetKind::Array, TargetKind::Array) => array::transform(s, c, server_wins),
            (TargetKind::Object, TargetKind::Object) => object::transform(s, c, server_wins),
            (TargetKind::Number, TargetKind::Number)
            | (TargetKind::Boolean, TargetKind::Boolean)
            | (TargetKind::Date, TargetKind::Date) => scalar::transform(s, c, server_wins),
            _ => Err(unsupported(s, c)),
        }
    }
}
