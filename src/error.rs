//! Diagnostics shared by every stage of the assembler.
//!
//! Every non-fatal error carries a [`Span`] (line/column of the offending
//! token) and, once a file is known, the source file name, so the CLI can
//! print `ERROR (file:line:col): message` regardless of which stage raised
//! it. `Fatal` is reserved for conditions the grammar driver itself never
//! raises — I/O failures reading the initial source file, surfaced by the
//! CLI before assembly even starts.

use std::path::PathBuf;

use thiserror::Error;

/// Location of a token or construct in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("unrecognized character '{0}'")]
    LexInvalid(String),
    #[error("expected {expected}, saw {found}")]
    ParseUnexpected { expected: String, found: String },
    #[error("operand list does not match '{mnemonic}': {reason}")]
    OperandMismatch { mnemonic: String, reason: String },
    #[error("label '{0}' redefined (first defined here)")]
    LabelRedefined(String),
    #[error("label '{0}' is never defined")]
    LabelUndefined(String),
    #[error("{0}")]
    SegmentMisuse(String),
    #[error("segment overflow: cursor 0x{cursor:08X} exceeds limit 0x{limit:08X}")]
    SegmentOverflow { cursor: u32, limit: u32 },
    #[error("cannot open include file '{0}'")]
    IncludeOpenFailed(String),
    #[error(".align {0} is out of range (must be 0-31)")]
    AlignOutOfRange(u32),
    #[error("fatal: {0}")]
    Fatal(String),
}

/// A single diagnostic, accumulated into
/// [`crate::assembler::AssembleResult::errors`] while parsing continues.
#[derive(Debug, Clone, PartialEq)]
pub struct AsmError {
    pub kind: ErrorKind,
    pub span: Span,
    pub file: Option<PathBuf>,
}

impl AsmError {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            file: None,
        }
    }

    pub fn with_file(mut self, file: PathBuf) -> Self {
        self.file = Some(file);
        self
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, ErrorKind::Fatal(_))
    }
}

impl std::fmt::Display for AsmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let file = self
            .file
            .as_ref()
            .and_then(|p| p.to_str())
            .unwrap_or("<unknown>");
        write!(
            f,
            "ERROR ({}:{}:{}): {}",
            file, self.span.line, self.span.col, self.kind
        )
    }
}

impl std::error::Error for AsmError {}
