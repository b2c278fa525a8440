//! Component I: the fatal-error taxonomy (§7.4–7.5).
//!
//! Tolerated source-shape issues (unmatched brackets, unknown bytes) and
//! runtime clamping are not errors at all — they're normalized silently by
//! the lexer/linker or the tape, per the edge policy. `BfError` exists only
//! for the two genuinely fatal cases: I/O failure and specializer codegen
//! failure.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BfError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The AOT specializer failed to build a reduced-IR step for the op at
    /// `index`. Carries a textual dump of the reduced IR assembled so far so
    /// the failure can be diagnosed without re-running under a debugger.
    #[error("specializer failed at ir index {index}: {reason}\n--- reduced ir so far ---\n{dump}")]
    Codegen { index: usize, reason: String, dump: String },
}

impl BfError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BfError::Io { path: path.into(), source }
    }

    pub fn codegen(index: usize, reason: impl Into<String>, dump: impl Into<String>) -> Self {
        BfError::Codegen { index, reason: reason.into(), dump: dump.into() }
    }
}

pub type BfResult<T> = Result<T, BfError>;
