//! Component B: pair `LoopOpen`/`LoopClose` by index, discarding anything
//! that can't be paired. Turns IR₀ into IR₁.

use crate::ir::{OpKind, Program};

/// Link brackets in `ir0`, producing IR₁.
///
/// An unmatched `]` (empty stack at close time) is dropped silently. An
/// unmatched `[` (still on the stack at end of input) is dropped together
/// with nothing else: the ops that would have been its body are kept, only
/// the `LoopOpen` itself is removed, and every surviving bracket pair's
/// operand is renumbered to the post-removal index.
pub fn link(ir0: Program) -> Program {
    let mut out = Program::with_capacity(ir0.len());
    let mut open_stack: Vec<usize> = Vec::new();

    for op in ir0 {
        match op.kind {
            OpKind::LoopOpen => {
                open_stack.push(out.len());
                out.push(op);
            }
            OpKind::LoopClose => {
                match open_stack.pop() {
                    Some(open_idx) => {
                        let close_idx = out.len();
                        out[open_idx].operand = close_idx as i32;
                        out.push(crate::ir::Op::loop_close(open_idx as i32));
                    }
                    None => {
                        // Unmatched ']': discard, do not emit.
                    }
                }
            }
            _ => out.push(op),
        }
    }

    if open_stack.is_empty() {
        debug_assert!(crate::ir::brackets_well_formed(&out));
        return out;
    }

    // Remaining stack entries are unmatched '[': drop just those ops and
    // renumber the surviving pairs.
    let removed: std::collections::HashSet<usize> = open_stack.into_iter().collect();
    let mut new_index = vec![0usize; out.len()];
    let mut compacted = Program::with_capacity(out.len() - removed.len());
    for (old_idx, op) in out.into_iter().enumerate() {
        if removed.contains(&old_idx) {
            continue;
        }
        new_index[old_idx] = compacted.len();
        compacted.push(op);
    }
    for op in &mut compacted {
        if op.kind.is_bracket() {
            op.operand = new_index[op.operand as usize] as i32;
        }
    }

    debug_assert!(crate::ir::brackets_well_formed(&compacted));
    compacted
}
