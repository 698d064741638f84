//! Character reader over one input line

/// Byte cursor with 1-based column tracking
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::from_bytes(src.as_bytes())
    }

    /// Cursor over raw line bytes, which need not be UTF-8
    pub fn from_bytes(src: &'a [u8]) -> Self {
        Self {
            src,
            pos: 0,
            column: 1,
        }
    }

    /// Next character without consuming it
    pub fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    /// Consume the next character.
    ///
    /// A newline is returned but does not advance the column.
    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b != b'\n' {
            self.column += 1;
        }
        Some(b)
    }

    /// Consume the next character if it equals `expected`
    pub fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Skip spaces, tabs and carriage returns
    pub fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.bump();
        }
    }

    /// Discard everything up to (not including) the next newline
    pub fn skip_line(&mut self) {
        while matches!(self.peek(), Some(b) if b != b'\n') {
            self.bump();
        }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }
}
