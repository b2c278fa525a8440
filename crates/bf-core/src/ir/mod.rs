//! The intermediate representation shared by every compilation stage.
//!
//! `Op` is deliberately flat: one `kind` tag, one integer `operand` whose
//! meaning depends on `kind`, and a `targets` list used only by `MulAdd`.
//! Keeping every stage (lexer, linker, optimizer, both executors) working
//! over this single type is what lets the hot-loop interpreter and the
//! AOT specializer share the pattern-recognition code in [`crate::optimizer`].

/// Tag for an IR element. See the module docs for the operand/targets contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    MoveLeft,
    MoveRight,
    Add,
    Sub,
    Output,
    Input,
    LoopOpen,
    LoopClose,
    Zero,
    Copy,
    MulAdd,
    ScanLeft,
    ScanRight,
}

impl OpKind {
    /// MoveLeft/MoveRight/Add/Sub runs are fused by the lexer; every other
    /// kind always stands on its own.
    pub fn is_fusible(self) -> bool {
        matches!(
            self,
            OpKind::MoveLeft | OpKind::MoveRight | OpKind::Add | OpKind::Sub
        )
    }

    pub fn is_bracket(self) -> bool {
        matches!(self, OpKind::LoopOpen | OpKind::LoopClose)
    }
}

/// One IR element.
///
/// `operand` means, depending on `kind`:
/// - `MoveLeft`/`MoveRight`/`Add`/`Sub`: run-length (always ≥ 1).
/// - `LoopOpen`: IR index of the matching `LoopClose`.
/// - `LoopClose`: IR index of the matching `LoopOpen`.
/// - `Copy`: signed offset of the destination cell.
/// - `ScanLeft`/`ScanRight`: signed stride.
/// - `Output`/`Input`/`Zero`: unused (0).
/// - `MulAdd`: unused (0); see `targets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    pub kind: OpKind,
    pub operand: i32,
    /// `(offset, factor)` pairs, pairwise-distinct offsets, non-zero factors.
    /// Populated only for `MulAdd`; empty otherwise.
    pub targets: Vec<(i32, i32)>,
}

impl Op {
    fn bare(kind: OpKind, operand: i32) -> Self {
        Op { kind, operand, targets: Vec::new() }
    }

    pub fn move_left(n: i32) -> Self {
        Op::bare(OpKind::MoveLeft, n)
    }
    pub fn move_right(n: i32) -> Self {
        Op::bare(OpKind::MoveRight, n)
    }
    pub fn add(n: i32) -> Self {
        Op::bare(OpKind::Add, n)
    }
    pub fn sub(n: i32) -> Self {
        Op::bare(OpKind::Sub, n)
    }
    pub fn output() -> Self {
        Op::bare(OpKind::Output, 0)
    }
    pub fn input() -> Self {
        Op::bare(OpKind::Input, 0)
    }
    pub fn loop_open() -> Self {
        Op::bare(OpKind::LoopOpen, 0)
    }
    pub fn loop_close(open_index: i32) -> Self {
        Op::bare(OpKind::LoopClose, open_index)
    }
    pub fn zero() -> Self {
        Op::bare(OpKind::Zero, 0)
    }
    pub fn copy(offset: i32) -> Self {
        Op::bare(OpKind::Copy, offset)
    }
    pub fn mul_add(targets: Vec<(i32, i32)>) -> Self {
        Op { kind: OpKind::MulAdd, operand: 0, targets }
    }
    pub fn scan_left(stride: i32) -> Self {
        Op::bare(OpKind::ScanLeft, -stride.abs())
    }
    pub fn scan_right(stride: i32) -> Self {
        Op::bare(OpKind::ScanRight, stride.abs())
    }
}

/// An ordered sequence of [`Op`]s. Invariants are documented on the module
/// that produced the program at hand (see `lexer`, `linker`, `optimizer`).
pub type Program = Vec<Op>;

/// Checks invariant (1) from the data model: every bracket is paired and the
/// pairing is symmetric. Used by tests and by `debug_assert!`s in the linker.
pub fn brackets_well_formed(program: &Program) -> bool {
    for (i, op) in program.iter().enumerate() {
        match op.kind {
            OpKind::LoopOpen => {
                let j = op.operand as usize;
                if j >= program.len() {
                    return false;
                }
                if program[j].kind != OpKind::LoopClose || program[j].operand as usize != i {
                    return false;
                }
            }
            OpKind::LoopClose => {
                let j = op.operand as usize;
                if j >= program.len() {
                    return false;
                }
                if program[j].kind != OpKind::LoopOpen || program[j].operand as usize != i {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}
