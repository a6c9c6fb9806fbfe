//! Same-node rules for numbers, booleans and dates.

use crate::operation::{DiscreteOperation, OperationKind};

use super::{set_set, unsupported, DiscretePair, TransformError};

pub(super) fn transform(s: &DiscreteOperation, c: &DiscreteOperation, server_wins: bool) -> Result<DiscretePair, TransformError> {
    use OperationKind::*;

    match (&s.kind, &c.kind) {
        // Deltas pass through unchanged. Every order yields the same sum
        // while values stay integral and below 2^53; three or more
        // fractional deltas may round differently depending on arrival order.
        (NumberDelta { .. }, NumberDelta { .. }) => Ok((s.clone(), c.clone())),
        (NumberSet { .. }, NumberDelta { .. }) => Ok((s.clone(), c.clone().into_no_op())),
        (NumberDelta { .. }, NumberSet { .. }) => Ok((s.clone().into_no_op(), c.clone())),
        (NumberSet { .. }, NumberSet { .. })
        | (BooleanSet { .. }, BooleanSet { .. })
        | (DateSet { .. }, DateSet { .. }) => Ok(set_set(s, c, server_wins)),
        _ => Err(unsupported(s, c)),
    }
}
