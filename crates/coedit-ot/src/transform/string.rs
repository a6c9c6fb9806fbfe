//! Same-node rules for string operations.
//!
//! Indices and lengths count chars.

use crate::operation::{DiscreteOperation, OperationKind};

use super::{set_set, unsupported, DiscretePair, TransformError};

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn insert(op: &DiscreteOperation, index: usize, value: &str) -> DiscreteOperation {
    op.with_kind(OperationKind::StringInsert {
        index,
        value: value.to_string(),
    })
}

fn remove(op: &DiscreteOperation, index: usize, value: String) -> DiscreteOperation {
    op.with_kind(OperationKind::StringRemove { index, value })
}

pub(super) fn transform(s: &DiscreteOperation, c: &DiscreteOperation, server_wins: bool) -> Result<DiscretePair, TransformError> {
    use OperationKind::*;

    match (&s.kind, &c.kind) {
        (StringInsert { index: si, value: sv }, StringInsert { index: ci, value: cv }) => {
            if si < ci || (si == ci && server_wins) {
                Ok((s.clone(), insert(c, ci + char_len(sv), cv)))
            } else {
                Ok((insert(s, si + char_len(cv), sv), c.clone()))
            }
        }
        (StringInsert { .. }, StringRemove { .. }) => Ok(insert_remove(s, c)),
        (StringRemove { .. }, StringInsert { .. }) => {
            let (c, s) = insert_remove(c, s);
            Ok((s, c))
        }
        (StringRemove { index: si, value: sv }, StringRemove { index: ci, value: cv }) => {
            Ok(remove_remove(s, *si, sv, c, *ci, cv))
        }
        (StringSet { .. }, StringSet { .. }) => Ok(set_set(s, c, server_wins)),
        (StringSet { .. }, StringInsert { .. } | StringRemove { .. }) => {
            Ok((s.clone(), c.clone().into_no_op()))
        }
        (StringInsert { .. } | StringRemove { .. }, StringSet { .. }) => {
            Ok((s.clone().into_no_op(), c.clone()))
        }
        _ => Err(unsupported(s, c)),
    }
}

/// Returns `(ins', rem')`.
fn insert_remove(ins: &DiscreteOperation, rem: &DiscreteOperation) -> DiscretePair {
    let (OperationKind::StringInsert { index: ii, value: iv }, OperationKind::StringRemove { index: ri, value: rv }) =
        (&ins.kind, &rem.kind)
    else {
        return (ins.clone(), rem.clone());
    };
    let (ii, ri) = (*ii, *ri);
    let il = char_len(iv);
    let rl = char_len(rv);

    if ii <= ri {
        return (ins.clone(), remove(rem, ri + il, rv.clone()));
    }
    if ii >= ri + rl {
        return (insert(ins, ii - rl, iv), rem.clone());
    }
    // The insert lands inside the removed range: the remove grows to take
    // the inserted text with it.
    let offset = ii - ri;
    let mut grown = char_slice(rv, 0, offset);
    grown.push_str(iv);
    grown.push_str(&char_slice(rv, offset, rl));
    (ins.clone().into_no_op(), remove(rem, ri, grown))
}

/// Removes from `(index, value)` the chars also covered by `[other_start, other_end)`.
fn subtract(index: usize, value: &str, other_start: usize, other_end: usize) -> String {
    let len = char_len(value);
    let mut kept = String::new();
    if index < other_start {
        kept.push_str(&char_slice(value, 0, (other_start - index).min(len)));
    }
    if index + len > other_end {
        kept.push_str(&char_slice(value, other_end.saturating_sub(index), len));
    }
    kept
}

fn remove_remove(
    s: &DiscreteOperation,
    si: usize,
    sv: &str,
    c: &DiscreteOperation,
    ci: usize,
    cv: &str,
) -> DiscretePair {
    let sl = char_len(sv);
    let cl = char_len(cv);

    if si + sl <= ci {
        return (s.clone(), remove(c, ci - sl, cv.to_string()));
    }
    if ci + cl <= si {
        return (remove(s, si - cl, sv.to_string()), c.clone());
    }
    if si == ci && sl == cl {
        return (s.clone().into_no_op(), c.clone().into_no_op());
    }

    // Overlapping ranges: each side keeps what the other did not remove.
    let start = si.min(ci);
    let s_kept = subtract(si, sv, ci, ci + cl);
    let c_kept = subtract(ci, cv, si, si + sl);
    let s = if s_kept.is_empty() {
        s.clone().into_no_op()
    } else {
        remove(s, start, s_kept)
    };
    let c = if c_kept.is_empty() {
        c.clone().into_no_op()
    } else {
        remove(c, start, c_kept)
    };
    (s, c)
}
