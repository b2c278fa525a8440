//! Component C: loop idiom recognition.
//!
//! [`recognize_body`] is the single source of truth for "does this loop body
//! collapse to a high-level op", shared by the eager compile-time pass
//! ([`optimize`], turning IR₁ into IR₂) and the hot-loop interpreter's lazy
//! runtime recognition ([`crate::vm::interpreter`]).

use crate::ir::{Op, OpKind, Program};
use std::collections::BTreeMap;

/// Try to recognize `body` (the ops strictly between a `LoopOpen` and its
/// matching `LoopClose`) as one of the idioms in §4.C. Returns the
/// replacement op on a match, `None` if the loop must run as a normal loop.
pub fn recognize_body(body: &[Op]) -> Option<Op> {
    recognize_zero(body)
        .or_else(|| recognize_balanced_decrement(body))
        .or_else(|| recognize_scan(body))
}

fn recognize_zero(body: &[Op]) -> Option<Op> {
    if body.len() == 1 && matches!(body[0].kind, OpKind::Add | OpKind::Sub) && body[0].operand == 1
    {
        Some(Op::zero())
    } else {
        None
    }
}

fn recognize_balanced_decrement(body: &[Op]) -> Option<Op> {
    let first = body.first()?;
    if first.kind != OpKind::Sub || first.operand != 1 {
        return None;
    }

    let mut pos: i32 = 0;
    // BTreeMap keeps ascending-offset order, fixing an iteration order for
    // MulAdd targets even though the semantics are order-independent.
    let mut deltas: BTreeMap<i32, i32> = BTreeMap::new();

    for op in &body[1..] {
        match op.kind {
            OpKind::MoveLeft => pos -= op.operand,
            OpKind::MoveRight => pos += op.operand,
            OpKind::Add => *deltas.entry(pos).or_insert(0) += op.operand,
            OpKind::Sub => *deltas.entry(pos).or_insert(0) -= op.operand,
            _ => return None,
        }
    }

    if pos != 0 {
        return None;
    }

    deltas.remove(&0);
    deltas.retain(|_, delta| *delta != 0);

    if deltas.is_empty() {
        return Some(Op::zero());
    }
    if deltas.len() == 1 {
        let (&offset, &factor) = deltas.iter().next().unwrap();
        if factor == 1 {
            return Some(Op::copy(offset));
        }
    }
    Some(Op::mul_add(deltas.into_iter().collect()))
}

fn recognize_scan(body: &[Op]) -> Option<Op> {
    if body.len() != 1 {
        return None;
    }
    let op = &body[0];
    match op.kind {
        OpKind::MoveLeft if op.operand >= 1 => Some(Op::scan_left(op.operand)),
        OpKind::MoveRight if op.operand >= 1 => Some(Op::scan_right(op.operand)),
        _ => None,
    }
}

/// Eagerly rewrite every recognizable loop in `ir1`, producing IR₂.
///
/// Processes brackets bottom-up: because `LoopClose` for the innermost loop
/// of any nesting is always encountered before its enclosing loop's, the
/// body slice examined for an outer loop already contains any rewritten
/// high-level ops from loops nested inside it.
pub fn optimize(ir1: &Program) -> Program {
    let mut out = Program::with_capacity(ir1.len());
    let mut open_stack: Vec<usize> = Vec::new();

    for op in ir1 {
        match op.kind {
            OpKind::LoopOpen => {
                open_stack.push(out.len());
                out.push(Op::loop_open());
            }
            OpKind::LoopClose => {
                let open_idx = open_stack.pop().expect("ir1 brackets are already linked");
                let body = &out[open_idx + 1..];
                if let Some(rewritten) = recognize_body(body) {
                    out.truncate(open_idx);
                    out.push(rewritten);
                } else {
                    let close_idx = out.len();
                    out[open_idx].operand = close_idx as i32;
                    out.push(Op::loop_close(open_idx as i32));
                }
            }
            _ => out.push(op.clone()),
        }
    }

    debug_assert!(crate::ir::brackets_well_formed(&out));
    out
}
