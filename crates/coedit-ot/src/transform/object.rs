//! Same-node rules for object operations.
//!
//! Operations on different properties commute. On the same property, a
//! write beats a remove and two writes are settled by priority; the
//! surviving write is re-expressed so it applies on either side.

use crate::operation::{DiscreteOperation, OperationKind};

use super::{set_set, unsupported, DiscretePair, TransformError};

fn prop(kind: &OperationKind) -> Option<&str> {
    match kind {
        OperationKind::ObjectAddProperty { prop, .. }
        | OperationKind::ObjectSetProperty { prop, .. }
        | OperationKind::ObjectRemoveProperty { prop } => Some(prop),
        _ => None,
    }
}

/// Re-express a property write as an add, for when the other side removed it.
fn as_add(op: &DiscreteOperation) -> DiscreteOperation {
    match &op.kind {
        OperationKind::ObjectAddProperty { prop, value } | OperationKind::ObjectSetProperty { prop, value } => {
            op.with_kind(OperationKind::ObjectAddProperty {
                prop: prop.clone(),
                value: value.clone(),
            })
        }
        _ => op.clone(),
    }
}

/// Re-express a property write as a set, for when the other side wrote it too.
fn as_set(op: &DiscreteOperation) -> DiscreteOperation {
    match &op.kind {
        OperationKind::ObjectAddProperty { prop, value } | OperationKind::ObjectSetProperty { prop, value } => {
            op.with_kind(OperationKind::ObjectSetProperty {
                prop: prop.clone(),
                value: value.clone(),
            })
        }
        _ => op.clone(),
    }
}

pub(super) fn transform(s: &DiscreteOperation, c: &DiscreteOperation, server_wins: bool) -> Result<DiscretePair, TransformError> {
    use OperationKind::*;

    match (&s.kind, &c.kind) {
        (ObjectSet { .. }, ObjectSet { .. }) => return Ok(set_set(s, c, server_wins)),
        (ObjectSet { .. }, _) => return Ok((s.clone(), c.clone().into_no_op())),
        (_, ObjectSet { .. }) => return Ok((s.clone().into_no_op(), c.clone())),
        _ => {}
    }

    let (Some(sp), Some(cp)) = (prop(&s.kind), prop(&c.kind)) else {
        return Err(unsupported(s, c));
    };
    if sp != cp {
        return Ok((s.clone(), c.clone()));
    }

    let pair = match (&s.kind, &c.kind) {
        (ObjectRemoveProperty { .. }, ObjectRemoveProperty { .. }) => {
            (s.clone().into_no_op(), c.clone().into_no_op())
        }
        (ObjectRemoveProperty { .. }, _) => (s.clone().into_no_op(), as_add(c)),
        (_, ObjectRemoveProperty { .. }) => (as_add(s), c.clone().into_no_op()),
        _ if server_wins => (as_set(s), c.clone().into_no_op()),
        _ => (s.clone().into_no_op(), as_set(c)),
    };
    Ok(pair)
}
