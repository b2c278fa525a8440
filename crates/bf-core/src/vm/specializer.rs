//! Component D: the AOT specializer.
//!
//! Per §9's design notes, "specialization" here means building a *reduced
//! IR* — a `Vec` of [`Step`]s, most of them straight-line closures with a
//! tape-offset already baked in by [`build`] — and running it through a
//! tight dispatch loop ([`Specialized::run`]). This is the safe-Rust
//! substitute for the source material's native/eval-based code generation;
//! no machine code is emitted, matching the Non-goals in §1.
//!
//! The key optimization is offset batching: consecutive `MoveLeft`/
//! `MoveRight` runs accumulate into a running `static_off` instead of each
//! touching `tape.cursor`. Every closure built while a batch is open reads
//! `tape.cursor + static_off (+ k)` instead of `tape.cursor`. The offset is
//! flushed into the real cursor before anything that depends on its actual
//! value: `Input`, `LoopOpen`, `LoopClose`, and the end of the program.

use crate::error::{BfError, BfResult};
use crate::ir::{Op, OpKind, Program};
use crate::tape::Tape;
use std::fmt::Write as _;
use std::io::{Read, Write};

type Effect = Box<dyn Fn(&mut Tape)>;

enum Step {
    /// A non-branching, non-I/O tape mutation with `static_off` baked in.
    Exec(Effect),
    /// Flush `static_off` into `tape.cursor` (`cc += off; off = 0`).
    Flush(i64),
    /// Write `tape[cursor + off]`.
    Output(i64),
    Input,
    ScanLeft(i64),
    ScanRight(i64),
    /// Index (in the `Step` vec) of the matching `LoopClose`.
    LoopOpen(usize),
    /// Index (in the `Step` vec) of the matching `LoopOpen`.
    LoopClose(usize),
}

/// A program reduced to a flat, directly-dispatchable step sequence.
pub struct Specialized {
    steps: Vec<Step>,
}

impl std::fmt::Debug for Specialized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Specialized")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl Specialized {
    /// Build the reduced IR for `program` (expected to be IR₂, i.e. already
    /// passed through [`crate::optimizer::optimize`], though building from
    /// an unoptimized program is also well-defined — loops just stay loops).
    pub fn build(program: &Program) -> BfResult<Specialized> {
        let mut steps: Vec<Step> = Vec::with_capacity(program.len());
        let mut open_stack: Vec<usize> = Vec::new();
        let mut static_off: i64 = 0;

        macro_rules! flush {
            () => {
                if static_off != 0 {
                    steps.push(Step::Flush(static_off));
                    static_off = 0;
                }
            };
        }

        for (index, op) in program.iter().enumerate() {
            match op.kind {
                OpKind::MoveLeft => static_off -= op.operand as i64,
                OpKind::MoveRight => static_off += op.operand as i64,
                OpKind::Add => {
                    let off = static_off;
                    let delta = (op.operand as u32 & 0xFF) as u8;
                    steps.push(Step::Exec(Box::new(move |tape| {
                        if let Some(idx) = tape.signed_index(off) {
                            let v = tape.get(idx).unwrap_or(0).wrapping_add(delta);
                            tape.set(idx, v);
                        }
                    })));
                }
                OpKind::Sub => {
                    let off = static_off;
                    let delta = (op.operand as u32 & 0xFF) as u8;
                    steps.push(Step::Exec(Box::new(move |tape| {
                        if let Some(idx) = tape.signed_index(off) {
                            let v = tape.get(idx).unwrap_or(0).wrapping_sub(delta);
                            tape.set(idx, v);
                        }
                    })));
                }
                OpKind::Zero => {
                    let off = static_off;
                    steps.push(Step::Exec(Box::new(move |tape| {
                        if let Some(idx) = tape.signed_index(off) {
                            tape.set(idx, 0);
                        }
                    })));
                }
                OpKind::Copy => {
                    let off = static_off;
                    let dst_off = off + op.operand as i64;
                    steps.push(Step::Exec(Box::new(move |tape| {
                        if let Some(src_idx) = tape.signed_index(off) {
                            let value = tape.get(src_idx).unwrap_or(0);
                            if let Some(dst_idx) = tape.signed_index(dst_off) {
                                let updated = tape.get(dst_idx).unwrap_or(0).wrapping_add(value);
                                tape.set(dst_idx, updated);
                            }
                            tape.set(src_idx, 0);
                        }
                    })));
                }
                OpKind::MulAdd => {
                    let off = static_off;
                    let targets: Vec<(i64, i32)> =
                        op.targets.iter().map(|&(o, f)| (off + o as i64, f)).collect();
                    steps.push(Step::Exec(Box::new(move |tape| {
                        if let Some(src_idx) = tape.signed_index(off) {
                            let value = tape.get(src_idx).unwrap_or(0) as i32;
                            for &(dst_off, factor) in &targets {
                                if let Some(dst_idx) = tape.signed_index(dst_off) {
                                    let delta = ((value * factor) as u32 & 0xFF) as u8;
                                    let updated = tape.get(dst_idx).unwrap_or(0).wrapping_add(delta);
                                    tape.set(dst_idx, updated);
                                }
                            }
                            tape.set(src_idx, 0);
                        }
                    })));
                }
                OpKind::Output => {
                    // Reads tape[cc+static_off] directly; no flush needed.
                    steps.push(Step::Output(static_off));
                }
                OpKind::Input => {
                    flush!();
                    steps.push(Step::Input);
                }
                OpKind::ScanLeft => {
                    flush!();
                    steps.push(Step::ScanLeft(op.operand as i64));
                }
                OpKind::ScanRight => {
                    flush!();
                    steps.push(Step::ScanRight(op.operand as i64));
                }
                OpKind::LoopOpen => {
                    flush!();
                    open_stack.push(steps.len());
                    steps.push(Step::LoopOpen(0));
                }
                OpKind::LoopClose => {
                    flush!();
                    let open_idx = open_stack.pop().ok_or_else(|| {
                        BfError::codegen(index, "unmatched LoopClose reached specializer", dump(&steps))
                    })?;
                    let close_idx = steps.len();
                    steps[open_idx] = Step::LoopOpen(close_idx);
                    steps.push(Step::LoopClose(open_idx));
                }
            }
        }
        flush!();

        if !open_stack.is_empty() {
            return Err(BfError::codegen(
                program.len(),
                "unmatched LoopOpen survived into the specializer",
                dump(&steps),
            ));
        }

        Ok(Specialized { steps })
    }

    /// Run the reduced IR against `tape`.
    pub fn run<R: Read, W: Write>(&self, tape: &mut Tape, input: &mut R, output: &mut W) -> BfResult<()> {
        let mut pc = 0usize;
        while pc < self.steps.len() {
            match &self.steps[pc] {
                Step::Exec(effect) => {
                    effect(tape);
                    pc += 1;
                }
                Step::Flush(off) => {
                    tape.cursor = clamp_cursor(tape.cursor as i64 + off);
                    pc += 1;
                }
                Step::Output(off) => {
                    let byte = tape.signed_index(*off).and_then(|idx| tape.get(idx)).unwrap_or(0);
                    output.write_all(&[byte]).map_err(|err| BfError::io("<stdout>", err))?;
                    pc += 1;
                }
                Step::Input => {
                    crate::vm::apply_input(tape, input)?;
                    pc += 1;
                }
                Step::ScanLeft(stride) | Step::ScanRight(stride) => {
                    while tape.current() != 0 {
                        let next = tape.cursor as i64 + stride;
                        if next < 0 || next as usize >= crate::tape::TAPE_SIZE {
                            break;
                        }
                        tape.cursor = next as usize;
                    }
                    pc += 1;
                }
                Step::LoopOpen(close_idx) => {
                    if tape.current() == 0 {
                        pc = close_idx + 1;
                    } else {
                        pc += 1;
                    }
                }
                Step::LoopClose(open_idx) => {
                    if tape.current() != 0 {
                        pc = open_idx + 1;
                    } else {
                        pc += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Render the reduced IR as text, one step per line. Used by the CLI's
    /// diagnostic dump mode; not on any hot path.
    pub fn dump(&self) -> String {
        dump(&self.steps)
    }
}

fn clamp_cursor(raw: i64) -> usize {
    raw.clamp(0, crate::tape::TAPE_SIZE as i64 - 1) as usize
}

fn dump(steps: &[Step]) -> String {
    let mut out = String::new();
    for (i, step) in steps.iter().enumerate() {
        let _ = writeln!(out, "{i:4}: {}", describe(step));
    }
    out
}

fn describe(step: &Step) -> &'static str {
    match step {
        Step::Exec(_) => "Exec",
        Step::Flush(_) => "Flush",
        Step::Output(_) => "Output",
        Step::Input => "Input",
        Step::ScanLeft(_) => "ScanLeft",
        Step::ScanRight(_) => "ScanRight",
        Step::LoopOpen(_) => "LoopOpen",
        Step::LoopClose(_) => "LoopClose",
    }
}

/// Convenience: build and run in one call.
pub fn run_aot<R: Read, W: Write>(
    program: &Program,
    tape: &mut Tape,
    input: &mut R,
    output: &mut W,
) -> BfResult<()> {
    Specialized::build(program)?.run(tape, input, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::linker::link;
    use crate::optimizer::optimize;
    use std::io::Cursor;

    fn compile(src: &[u8]) -> Program {
        optimize(&link(lex(src)))
    }

    fn run(src: &[u8], input: &[u8]) -> (Vec<u8>, Tape) {
        let ir2 = compile(src);
        let mut tape = Tape::new();
        let mut out = Vec::new();
        run_aot(&ir2, &mut tape, &mut Cursor::new(input), &mut out).unwrap();
        (out, tape)
    }

    #[test]
    fn hello_world() {
        let src = b"++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
        let (out, _) = run(src, b"");
        assert_eq!(out, b"Hello, World!\n");
    }

    #[test]
    fn matches_interpreter_on_the_same_program() {
        // Cornerstone equivalence property (§8): same program, same starting
        // state, identical output bytes and final tape contents for both D
        // and E (mode E here run without hot rewriting, i.e. on IR2 already
        // fully optimized, so no lazy recognition has any further work to do).
        let programs: &[&[u8]] = &[
            b"++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.",
            b"+++++[->+++<]>.",
            b"+++++[->++>+++<<]>.>.",
            b">>>+++[<]+.",
            b"++[>+++++<-]>[<+>-]+.",
        ];
        for src in programs {
            let ir2 = compile(src);

            let mut aot_tape = Tape::new();
            let mut aot_out = Vec::new();
            run_aot(&ir2, &mut aot_tape, &mut Cursor::new(&[][..]), &mut aot_out).unwrap();

            let mut interp_tape = Tape::new();
            let mut interp_out = Vec::new();
            crate::vm::interpret(&ir2, &mut interp_tape, &mut Cursor::new(&[][..]), &mut interp_out)
                .unwrap();

            assert_eq!(aot_out, interp_out, "output mismatch for {:?}", String::from_utf8_lossy(src));
            assert_eq!(aot_tape.cursor, interp_tape.cursor);
            for i in 0..crate::tape::TAPE_SIZE {
                assert_eq!(aot_tape.get(i), interp_tape.get(i), "cell {i} mismatch");
            }
        }
    }

    #[test]
    fn offset_batching_keeps_moves_correct_across_a_straight_line_run() {
        let (out, tape) = run(b">>>.<<<.", b"");
        assert_eq!(out, vec![0, 0]);
        assert_eq!(tape.cursor, 0);
    }

    #[test]
    fn offset_batching_diverges_from_the_interpreter_when_a_batch_leaves_the_tape() {
        // Documented, accepted divergence (see DESIGN.md): `static_off` is
        // not clamped until the next flush point, so an `Add` built while
        // the batch is transiently out of range resolves against that raw,
        // unclamped offset instead of a position the interpreter would ever
        // actually occupy. `<<<<<+.` moves left 5 from cursor 0 (clamped by
        // the interpreter to 0, but accumulated by the specializer as a raw
        // static_off of -5, never flushed before the `Add`), then adds 1 and
        // outputs the current cell.
        //
        // Interpreter: cursor clamps to 0, `Add` lands on cell 0, `Output`
        // reads the cell it just wrote: 1.
        // Specializer: the `Add` is built with offset -5; at run time
        // `tape.signed_index(-5)` (cursor still 0, unflushed) is out of
        // range, so the write is silently dropped; `Output` reads the same
        // out-of-range offset and falls back to 0.
        let src = b"<<<<<+.";
        let ir2 = compile(src);

        let mut aot_tape = Tape::new();
        let mut aot_out = Vec::new();
        run_aot(&ir2, &mut aot_tape, &mut Cursor::new(&[][..]), &mut aot_out).unwrap();

        let mut interp_tape = Tape::new();
        let mut interp_out = Vec::new();
        crate::vm::interpret(&ir2, &mut interp_tape, &mut Cursor::new(&[][..]), &mut interp_out).unwrap();

        assert_eq!(interp_out, vec![1]);
        assert_eq!(interp_tape.get(0), Some(1));

        assert_eq!(aot_out, vec![0]);
        assert_eq!(aot_tape.get(0), Some(0));

        // Both still land at cursor 0 (the interpreter via clamping, the
        // specializer via its own end-of-program flush), so this is purely
        // a cell-value and output divergence, not a crash or a cursor one.
        assert_eq!(aot_tape.cursor, 0);
        assert_eq!(interp_tape.cursor, 0);
    }

    #[test]
    fn unmatched_loop_close_is_rejected_with_a_codegen_diagnostic() {
        // Hand-build a malformed program that a well-formed lexer/linker
        // would never produce, to exercise the specializer's own defense.
        let malformed = vec![Op::loop_close(0)];
        let err = Specialized::build(&malformed).unwrap_err();
        match err {
            BfError::Codegen { index, .. } => assert_eq!(index, 0),
            other => panic!("expected Codegen error, got {other:?}"),
        }
    }
}
