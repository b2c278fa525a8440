//! Execution: components D (AOT specializer) and E (hot-loop interpreter).
//!
//! Both share the tape semantics for the high-level ops (`Zero`, `Copy`,
//! `MulAdd`, `ScanLeft`, `ScanRight`) defined once in [`apply_high_level`],
//! so the "D and E produce identical output" equivalence property (§8)
//! reduces to both drivers calling the same function at the same points.

pub mod interpreter;
pub mod specializer;

use crate::error::BfResult;
use crate::ir::{Op, OpKind};
use crate::tape::Tape;
use std::io::{Read, Write};

pub use interpreter::interpret;
pub use specializer::Specialized;

/// Apply the tape effect of a `Zero`/`Copy`/`MulAdd`/`ScanLeft`/`ScanRight`
/// op, per the contracts in §4.C. Panics if called with any other kind.
pub fn apply_high_level(tape: &mut Tape, op: &Op) {
    match op.kind {
        OpKind::Zero => tape.set_current(0),
        OpKind::Copy => {
            let value = tape.current();
            if let Some(dst) = tape.signed_index(op.operand as i64) {
                let updated = tape.get(dst).unwrap_or(0).wrapping_add(value);
                tape.set(dst, updated);
            }
            tape.set_current(0);
        }
        OpKind::MulAdd => {
            let value = tape.current() as i32;
            for &(offset, factor) in &op.targets {
                if let Some(dst) = tape.signed_index(offset as i64) {
                    let delta = ((value * factor) as u32 & 0xFF) as u8;
                    let updated = tape.get(dst).unwrap_or(0).wrapping_add(delta);
                    tape.set(dst, updated);
                }
            }
            tape.set_current(0);
        }
        OpKind::ScanLeft | OpKind::ScanRight => {
            let stride = op.operand as i64;
            while tape.current() != 0 {
                match tape.signed_index(stride) {
                    Some(next) => tape.cursor = next,
                    None => break,
                }
            }
        }
        other => panic!("apply_high_level called with non-high-level op kind {other:?}"),
    }
}

/// Read one byte for an `Input` op, per the EOF contract in §9: on EOF the
/// current cell is left unchanged.
pub fn apply_input<R: Read>(tape: &mut Tape, input: &mut R) -> BfResult<()> {
    let mut buf = [0u8; 1];
    match input.read(&mut buf) {
        Ok(0) => {} // EOF: leave the cell unchanged.
        Ok(_) => tape.set_current(buf[0]),
        Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
        Err(err) => return Err(crate::error::BfError::io("<stdin>", err)),
    }
    Ok(())
}

/// Write one byte for an `Output` op.
pub fn apply_output<W: Write>(tape: &Tape, output: &mut W) -> BfResult<()> {
    output
        .write_all(&[tape.current()])
        .map_err(|err| crate::error::BfError::io("<stdout>", err))
}
