//! Brainfuck lexer, loop optimizer, AOT specializer and hot-loop
//! interpreter.
//!
//! The pipeline mirrors the data flow of the system this crate implements:
//! raw source bytes go through [`lexer::lex`] (IR₀, run-length folded) then
//! [`linker::link`] (IR₁, brackets paired) and, for the AOT path, through
//! [`optimizer::optimize`] (IR₂, idiom loops collapsed). [`vm::interpret`]
//! can run either IR₁ or IR₂ directly; [`vm::specializer::run_aot`] expects
//! IR₂ but degrades gracefully (loops just stay loops) if given IR₁.

pub mod error;
pub mod ir;
pub mod lexer;
pub mod linker;
pub mod optimizer;
pub mod tape;
pub mod vm;

pub use error::{BfError, BfResult};
pub use ir::{Op, OpKind, Program};
pub use tape::Tape;

use std::io::{Read, Write};
use log::info;

/// Lex, link, and return IR₁: run-length folded, brackets paired, no loop
/// idioms rewritten yet.
pub fn compile_ir1(source: &[u8]) -> Program {
    let ir0 = lexer::lex(source);
    let ir1 = linker::link(ir0);
    info!(target: "bf_core::lexer", "lexed+linked {} ops from {} source bytes", ir1.len(), source.len());
    ir1
}

/// Lex, link, and eagerly optimize: IR₂, ready for the AOT specializer.
pub fn compile_ir2(source: &[u8]) -> Program {
    let ir1 = compile_ir1(source);
    let ir2 = optimizer::optimize(&ir1);
    let collapsed = ir1.len().saturating_sub(ir2.len());
    info!(target: "bf_core::optimizer", "collapsed {collapsed} ops via loop idiom recognition");
    ir2
}

/// Which executor runs the program. `Jit` keeps the name the upstream
/// benchmarking culture uses for a tracing/hot-path executor; no machine
/// code is ever emitted (see the crate's Non-goals) — it is the hot-loop
/// interpreter of §4.E, not a bytecode-to-native compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// AOT specializer (component D): one reduced-IR routine, built once.
    Aot,
    /// Hot-loop interpreter (component E): direct dispatch plus runtime
    /// pattern recognition once a loop crosses the hotness threshold.
    Jit,
}

/// Compile `source` and run it under `mode`, wiring `input`/`output` as the
/// program's `,`/`.` streams.
pub fn run<R: Read, W: Write>(
    source: &[u8],
    mode: Mode,
    input: &mut R,
    output: &mut W,
) -> BfResult<Tape> {
    let mut tape = Tape::new();
    match mode {
        Mode::Aot => {
            let ir2 = compile_ir2(source);
            vm::specializer::run_aot(&ir2, &mut tape, input, output)?;
        }
        Mode::Jit => {
            let ir1 = compile_ir1(source);
            vm::interpret(&ir1, &mut tape, input, output)?;
        }
    }
    Ok(tape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn both_modes_agree_on_hello_world() {
        let src = b"++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";

        let mut aot_out = Vec::new();
        run(src, Mode::Aot, &mut Cursor::new(&[][..]), &mut aot_out).unwrap();
        assert_eq!(aot_out, b"Hello, World!\n");

        let mut jit_out = Vec::new();
        run(src, Mode::Jit, &mut Cursor::new(&[][..]), &mut jit_out).unwrap();
        assert_eq!(jit_out, b"Hello, World!\n");
    }
}
