//! Same-node rules for array operations.

use crate::operation::{DiscreteOperation, OperationKind};

use super::{set_set, unsupported, DiscretePair, TransformError};

/// Where the element at index `i` ends up after moving `from` to `to`.
pub(crate) fn moved_index(from: usize, to: usize, i: usize) -> usize {
    if i == from {
        to
    } else if from < to && from < i && i <= to {
        i - 1
    } else if from > to && to <= i && i < from {
        i + 1
    } else {
        i
    }
}

/// Copy of an index-carrying operation pointing at `index`.
fn at(op: &DiscreteOperation, index: usize) -> DiscreteOperation {
    let kind = match &op.kind {
        OperationKind::ArrayInsert { value, .. } => OperationKind::ArrayInsert {
            index,
            value: value.clone(),
        },
        OperationKind::ArrayRemove { .. } => OperationKind::ArrayRemove { index },
        OperationKind::ArrayReplace { value, .. } => OperationKind::ArrayReplace {
            index,
            value: value.clone(),
        },
        other => other.clone(),
    };
    op.with_kind(kind)
}

fn moving(op: &DiscreteOperation, from: usize, to: usize) -> DiscreteOperation {
    op.with_kind(OperationKind::ArrayMove { from, to })
}

fn swap((a, b): DiscretePair) -> DiscretePair {
    (b, a)
}

pub(super) fn transform(s: &DiscreteOperation, c: &DiscreteOperation, server_wins: bool) -> Result<DiscretePair, TransformError> {
    use OperationKind::*;

    let pair = match (&s.kind, &c.kind) {
        (ArraySet { .. }, ArraySet { .. }) => set_set(s, c, server_wins),
        (ArraySet { .. }, _) => (s.clone(), c.clone().into_no_op()),
        (_, ArraySet { .. }) => (s.clone().into_no_op(), c.clone()),

        (ArrayInsert { index: si, .. }, ArrayInsert { index: ci, .. }) => {
            if si < ci || (si == ci && server_wins) {
                (s.clone(), at(c, ci + 1))
            } else {
                (at(s, si + 1), c.clone())
            }
        }
        (ArrayInsert { index: ii, .. }, ArrayRemove { index: ri }) => insert_remove(s, *ii, c, *ri),
        (ArrayRemove { index: ri }, ArrayInsert { index: ii, .. }) => swap(insert_remove(c, *ii, s, *ri)),
        (ArrayInsert { index: ii, .. }, ArrayReplace { index: pi, .. }) => insert_replace(s, *ii, c, *pi),
        (ArrayReplace { index: pi, .. }, ArrayInsert { index: ii, .. }) => swap(insert_replace(c, *ii, s, *pi)),
        (ArrayInsert { index: ii, .. }, ArrayMove { from, to }) => insert_move(s, *ii, c, *from, *to),
        (ArrayMove { from, to }, ArrayInsert { index: ii, .. }) => swap(insert_move(c, *ii, s, *from, *to)),

        (ArrayRemove { index: si }, ArrayRemove { index: ci }) => {
            if si == ci {
                (s.clone().into_no_op(), c.clone().into_no_op())
            } else if si < ci {
                (s.clone(), at(c, ci - 1))
            } else {
                (at(s, si - 1), c.clone())
            }
        }
        (ArrayRemove { index: ri }, ArrayReplace { index: pi, .. }) => remove_replace(s, *ri, c, *pi),
        (ArrayReplace { index: pi, .. }, ArrayRemove { index: ri }) => swap(remove_replace(c, *ri, s, *pi)),
        (ArrayRemove { index: ri }, ArrayMove { from, to }) => remove_move(s, *ri, c, *from, *to),
        (ArrayMove { from, to }, ArrayRemove { index: ri }) => swap(remove_move(c, *ri, s, *from, *to)),

        (ArrayReplace { index: si, .. }, ArrayReplace { index: ci, .. }) => {
            if si == ci {
                set_set(s, c, server_wins)
            } else {
                (s.clone(), c.clone())
            }
        }
        (ArrayReplace { index: pi, .. }, ArrayMove { from, to }) => {
            (at(s, moved_index(*from, *to, *pi)), c.clone())
        }
        (ArrayMove { from, to }, ArrayReplace { index: pi, .. }) => {
            (s.clone(), at(c, moved_index(*from, *to, *pi)))
        }

        (ArrayMove { from: sf, to: st }, ArrayMove { from: cf, to: ct }) => {
            move_move(s, (*sf, *st), c, (*cf, *ct), server_wins)
        }

        _ => return Err(unsupported(s, c)),
    };
    Ok(pair)
}

/// Returns `(ins', rem')`.
fn insert_remove(ins: &DiscreteOperation, ii: usize, rem: &DiscreteOperation, ri: usize) -> DiscretePair {
    if ii <= ri {
        (ins.clone(), at(rem, ri + 1))
    } else {
        (at(ins, ii - 1), rem.clone())
    }
}

/// Returns `(ins', rep')`.
fn insert_replace(ins: &DiscreteOperation, ii: usize, rep: &DiscreteOperation, pi: usize) -> DiscretePair {
    if ii <= pi {
        (ins.clone(), at(rep, pi + 1))
    } else {
        (ins.clone(), rep.clone())
    }
}

/// Returns `(ins', mv')`.
fn insert_move(ins: &DiscreteOperation, ii: usize, mv: &DiscreteOperation, from: usize, to: usize) -> DiscretePair {
    let shifted = if from < to && from < ii && ii <= to {
        ii - 1
    } else if from > to && to < ii && ii <= from {
        ii + 1
    } else {
        ii
    };
    let from2 = if ii <= from { from + 1 } else { from };
    let to2 = if ii <= to { to + 1 } else { to };
    (at(ins, shifted), moving(mv, from2, to2))
}

/// Returns `(rem', rep')`.
fn remove_replace(rem: &DiscreteOperation, ri: usize, rep: &DiscreteOperation, pi: usize) -> DiscretePair {
    if ri == pi {
        (rem.clone(), rep.clone().into_no_op())
    } else if ri < pi {
        (rem.clone(), at(rep, pi - 1))
    } else {
        (rem.clone(), rep.clone())
    }
}

/// Returns `(rem', mv')`.
fn remove_move(rem: &DiscreteOperation, ri: usize, mv: &DiscreteOperation, from: usize, to: usize) -> DiscretePair {
    if ri == from {
        // The moved element is gone; remove it from where it landed.
        return (at(rem, to), mv.clone().into_no_op());
    }
    let landed = moved_index(from, to, ri);
    let from2 = if ri < from { from - 1 } else { from };
    let to2 = if landed < to { to - 1 } else { to };
    (at(rem, landed), moving(mv, from2, to2))
}

fn move_move(
    s: &DiscreteOperation,
    (sf, st): (usize, usize),
    c: &DiscreteOperation,
    (cf, ct): (usize, usize),
    server_wins: bool,
) -> DiscretePair {
    if sf == cf {
        // Both moved the same element: the winner's destination stands.
        return if server_wins {
            (moving(s, ct, st), c.clone().into_no_op())
        } else {
            (s.clone().into_no_op(), moving(c, st, ct))
        };
    }

    // Client element's position once the server move is applied.
    let p = moved_index(sf, st, cf);
    // Server element's destination in the array without the client element.
    let r = if st > p { st - 1 } else { st };
    // Server element's position once the client move is applied.
    let cm = moved_index(cf, ct, sf);
    // Client element's destination in the array without the server element.
    let k = if cm < ct { ct - 1 } else { ct };
    let q = if r < k {
        k + 1
    } else if r > k {
        k
    } else if server_wins {
        k + 1
    } else {
        k
    };
    (moving(s, cm, moved_index(p, q, st)), moving(c, p, q))
}
