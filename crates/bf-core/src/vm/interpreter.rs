//! Component E: direct IR interpretation with runtime hot-loop pattern
//! recognition.
//!
//! Accepts either IR₁ (brackets linked, nothing rewritten) or IR₂ (some
//! loops already collapsed) — see §2's data flow. Any `LoopOpen` still
//! present is tracked by a per-index execution counter; once a loop has been
//! entered [`HOT_THRESHOLD`] times, [`crate::optimizer::recognize_body`] is
//! run once against its body. A match short-circuits the remaining
//! iterations by applying the high-level op and jumping past the
//! `LoopClose`; a miss is cached so recognition is never retried for that
//! bracket.

use crate::error::BfResult;
use crate::ir::{OpKind, Program};
use crate::optimizer::recognize_body;
use crate::tape::Tape;
use ahash::{AHashMap, AHashSet};
use std::io::{Read, Write};

/// Number of times a loop must be entered before the interpreter attempts
/// runtime pattern recognition on its body.
pub const HOT_THRESHOLD: u32 = 10;

/// Interpret `program` against `tape`, reading `input` for `,` and writing
/// `output` for `.`.
pub fn interpret<R: Read, W: Write>(
    program: &Program,
    tape: &mut Tape,
    input: &mut R,
    output: &mut W,
) -> BfResult<()> {
    let mut pc = 0usize;
    let mut hot_counts: AHashMap<usize, u32> = AHashMap::default();
    let mut cold_loops: AHashSet<usize> = AHashSet::default();

    while pc < program.len() {
        let op = &program[pc];
        match op.kind {
            OpKind::MoveLeft => {
                tape.move_left(op.operand as usize);
                pc += 1;
            }
            OpKind::MoveRight => {
                tape.move_right(op.operand as usize);
                pc += 1;
            }
            OpKind::Add => {
                tape.add(op.operand);
                pc += 1;
            }
            OpKind::Sub => {
                tape.sub(op.operand);
                pc += 1;
            }
            OpKind::Output => {
                super::apply_output(tape, output)?;
                pc += 1;
            }
            OpKind::Input => {
                super::apply_input(tape, input)?;
                pc += 1;
            }
            OpKind::Zero | OpKind::Copy | OpKind::MulAdd | OpKind::ScanLeft | OpKind::ScanRight => {
                super::apply_high_level(tape, op);
                pc += 1;
            }
            OpKind::LoopOpen => {
                if tape.current() == 0 {
                    pc = op.operand as usize + 1;
                    continue;
                }

                let close_idx = op.operand as usize;
                if !cold_loops.contains(&pc) {
                    let count = hot_counts.entry(pc).or_insert(0);
                    *count += 1;
                    if *count == HOT_THRESHOLD {
                        let body = &program[pc + 1..close_idx];
                        match recognize_body(body) {
                            Some(rewritten) => {
                                super::apply_high_level(tape, &rewritten);
                                pc = close_idx + 1;
                                continue;
                            }
                            None => {
                                cold_loops.insert(pc);
                            }
                        }
                    }
                }
                pc += 1;
            }
            OpKind::LoopClose => {
                if tape.current() != 0 {
                    pc = op.operand as usize + 1;
                } else {
                    pc += 1;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::linker::link;
    use std::io::Cursor;

    fn run(src: &[u8], input: &[u8]) -> (Vec<u8>, Tape) {
        let ir1 = link(lex(src));
        let mut tape = Tape::new();
        let mut out = Vec::new();
        interpret(&ir1, &mut tape, &mut Cursor::new(input), &mut out).unwrap();
        (out, tape)
    }

    #[test]
    fn hello_world() {
        let src = b"++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
        let (out, _) = run(src, b"");
        assert_eq!(out, b"Hello, World!\n");
    }

    #[test]
    fn zero_loop_runs_via_plain_interpretation() {
        let mut tape = Tape::new();
        tape.add(200);
        let ir1 = link(lex(b"[-]"));
        interpret(&ir1, &mut tape, &mut Cursor::new(&[][..]), &mut Vec::new()).unwrap();
        assert_eq!(tape.current(), 0);
        assert_eq!(tape.cursor, 0);
    }

    #[test]
    fn single_top_level_loop_never_crosses_the_hotness_threshold() {
        // A top-level loop's body is only re-executed through the
        // `LoopClose`-to-`open_idx + 1` back-edge, which never revisits the
        // `LoopOpen` op itself — so `hot_counts` for this bracket is
        // incremented exactly once (on the single entry from outside),
        // however many times the loop body iterates once inside. This
        // program always runs via plain iteration; it is a correctness
        // baseline, not a hot-path exercise (see the nested-loop test below
        // for one that actually reaches HOT_THRESHOLD entries).
        let (_out, tape) = run(b"+++++++++++[->+<]", b"");
        assert_eq!(tape.get(0), Some(0));
        assert_eq!(tape.get(1), Some(11));
    }

    #[test]
    fn nested_loop_crosses_threshold_on_its_tenth_distinct_entry() {
        // Each outer-loop iteration is a fresh *entry* into the inner loop
        // (pc flows into its `LoopOpen` from the straight-line code right
        // before it), and entries are exactly what `hot_counts` tracks. The
        // outer loop runs 12 times, setting cell 1 to 5 and draining it into
        // cell 3 through the inner balanced-decrement loop `[->>+<<]` (a
        // Copy(2) idiom) each time: the 10th entry crosses HOT_THRESHOLD and
        // must trigger `recognize_body`, replacing that entry's remaining
        // iterations with a single `apply_high_level` call. Entries 1-9 and
        // 11-12 still run by plain iteration. Both paths drain cell 1 into
        // cell 3 identically, so the final tape is the same regardless of
        // which entries actually took the recognized-op shortcut.
        let src = b"++++++++++++[>+++++[->>+<<]<-]";
        let (_out, tape) = run(src, b"");
        assert_eq!(tape.get(0), Some(0), "outer counter should reach zero");
        assert_eq!(tape.get(1), Some(0), "scratch cell fully drained every entry");
        assert_eq!(tape.get(3), Some(60), "12 entries x 5 per entry");
        assert_eq!(tape.cursor, 0);
    }

    #[test]
    fn input_leaves_cell_unchanged_on_eof() {
        let mut tape = Tape::new();
        tape.add(42);
        let ir1 = link(lex(b","));
        interpret(&ir1, &mut tape, &mut Cursor::new(&[][..]), &mut Vec::new()).unwrap();
        assert_eq!(tape.current(), 42);
    }

    #[test]
    fn input_reads_one_byte() {
        let (out, tape) = run(b",.", b"A");
        assert_eq!(out, b"A");
        assert_eq!(tape.current(), b'A');
    }

    #[test]
    fn scan_left_terminates_at_first_zero_cell() {
        let ir1 = link(lex(b">>>+++[<]"));
        let mut tape = Tape::new();
        interpret(&ir1, &mut tape, &mut Cursor::new(&[][..]), &mut Vec::new()).unwrap();
        assert_eq!(tape.cursor, 0);
    }

    #[test]
    fn plus_minus_roundtrip_leaves_tape_unchanged() {
        let (_out, tape) = run(b"+++---+-+-+-", b"");
        assert_eq!(tape.current(), 0);
    }

    #[test]
    fn unrecognized_loop_shapes_still_interpret_correctly() {
        // `[>+<-]` decrements the driver cell last, not first, so it never
        // matches the balanced-decrement precondition and must fall back to
        // plain iteration end to end.
        let src = b"++++++++++[>+<-]>[<+>-]";
        let (_out, tape) = run(src, b"");
        assert_eq!(tape.get(0), Some(10));
    }
}
