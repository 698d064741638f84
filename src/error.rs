use std::fmt;
use std::io;

/// Category of a compile error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Character that is not a command
    Syntax,
    /// Parameter missing, malformed or out of range
    ParameterRange,
    /// Octave outside 1..=8
    OctaveRange,
    /// `]` or `:` without an open `[`
    NestingUnderflow,
    /// `[` beyond the maximum nesting depth
    NestingOverflow,
    /// Second `:` inside one loop
    DuplicateExit,
    /// `J` or `X` inside a loop
    ReturnInNest,
    /// Transposition pushed a note out of the octave range
    NoteOverflow,
    /// Channel finished with a loop still open
    UnclosedNest,
    /// Output capacity exceeded
    Internal,
}

/// A compile error attributed to a source position
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (line {line}, column {column})")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// A failing line of a song, kept for reporting
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Channel letter the line was routed to
    pub channel: char,
    pub error: CompileError,
    /// Source text of the line, as read
    pub source: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: [{}] {}", self.channel, self.error)?;
        writeln!(f, "{}", self.source)?;
        write!(f, "{:>width$}", "^", width = self.error.column.max(1))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Compilation failed with {} error(s)", .diagnostics.len())]
    Compile { diagnostics: Vec<Diagnostic> },

    #[error("Bytecode decode error: {0}")]
    Decode(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A statement-level failure that has not yet been attributed to a line.
///
/// `column` is the position captured at the error site, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: ErrorKind,
    pub message: String,
    pub column: Option<usize>,
}

impl Fault {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            column: None,
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParameterRange, message)
    }

    pub fn at(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Attach the line, falling back to `fallback_column` when no column was captured
    pub fn into_error(self, line: usize, fallback_column: usize) -> CompileError {
        CompileError {
            kind: self.kind,
            message: self.message,
            line,
            column: self.column.unwrap_or(fallback_column),
        }
    }
}
