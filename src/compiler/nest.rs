//! Loop nesting and jump backpatching
//!
//! `[` writes `F0 <count>` with a placeholder count. `:` writes `F3 <word>`
//! with a placeholder forward offset. `]n` writes the backward jump, then
//! fills in the count and, if an exit marker was set, the forward offset to
//! the instruction following the jump.

use super::channel::{ChannelState, Snapshot};
use super::cursor::Cursor;
use super::output::Output;
use super::param::read_unsigned;
use crate::driver::opcode;
use crate::error::{ErrorKind, Fault};

/// Maximum number of simultaneously open loops
pub const MAX_NEST: usize = 4;

/// Size of the `:` instruction
const EXIT_SIZE: usize = 3;

/// One open `[`
#[derive(Debug, Clone)]
struct LoopFrame {
    /// Offset just after the count byte; the backward jump target
    body_start: usize,
    /// Offset just after the `:` instruction, if any
    exit_end: Option<usize>,
    /// State at the `:` marker, restored at `]`
    saved: Option<Snapshot>,
    /// Source position of the `[`
    line: usize,
    column: usize,
}

/// Stack of open loops, at most `MAX_NEST` deep
#[derive(Debug, Clone, Default)]
pub struct NestStack {
    frames: Vec<LoopFrame>,
}

impl NestStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Forget every open loop
    pub fn reset(&mut self) {
        self.frames.clear();
    }

    /// Source position of the innermost open `[`
    pub fn innermost_origin(&self) -> Option<(usize, usize)> {
        self.frames.last().map(|f| (f.line, f.column))
    }

    /// `[`
    pub fn open(&mut self, out: &mut Output, line: usize, column: usize) -> Result<(), Fault> {
        if self.frames.len() >= MAX_NEST {
            return Err(Fault::new(
                ErrorKind::NestingOverflow,
                format!("'[' nested too deeply (max {})", MAX_NEST),
            ));
        }
        out.write(&[opcode::LOOP_START, 0x00])?;
        self.frames.push(LoopFrame {
            body_start: out.len(),
            exit_end: None,
            saved: None,
            line,
            column,
        });
        Ok(())
    }

    /// `:`
    pub fn mark_exit(&mut self, out: &mut Output, state: &ChannelState) -> Result<(), Fault> {
        let frame = self.frames.last_mut().ok_or_else(|| {
            Fault::new(ErrorKind::NestingUnderflow, "':' used outside of '[' ']'")
        })?;
        if frame.exit_end.is_some() {
            return Err(Fault::new(
                ErrorKind::DuplicateExit,
                "':' used more than once in one '[' ']'",
            ));
        }
        out.write(&[opcode::LOOP_EXIT, 0x00, 0x00])?;
        frame.exit_end = Some(out.len());
        frame.saved = Some(state.snapshot());
        Ok(())
    }

    /// `]n`
    pub fn close(
        &mut self,
        cur: &mut Cursor,
        out: &mut Output,
        state: &mut ChannelState,
    ) -> Result<(), Fault> {
        let frame = self.frames.last().cloned().ok_or_else(|| {
            Fault::new(ErrorKind::NestingUnderflow, "']' without a matching '['")
        })?;
        let count = read_unsigned(cur).ok_or_else(|| Fault::range("']' has no repeat count"))?;
        if !(2..=255).contains(&count) {
            return Err(Fault::range("']' repeat count out of range (2..255)"));
        }

        // the loop stays open until every byte of it is in place
        out.write(&backward_jump(frame.body_start, out.len()))?;
        out.patch(frame.body_start - 1, &[count as u8])?;
        if let Some(exit_end) = frame.exit_end {
            let offset = (out.len() - exit_end) as u16;
            out.patch(exit_end - (EXIT_SIZE - 1), &offset.to_le_bytes())?;
        }

        self.frames.pop();
        if let Some(saved) = frame.saved {
            state.restore(&saved);
        }
        Ok(())
    }
}

/// Encode a jump from offset `at` back to `target`.
///
/// The short form stores the low byte of a -256..=-1 offset (high byte 0xFF
/// implied) relative to the end of its two-byte instruction; the long form
/// stores a 16-bit offset relative to the end of its three-byte instruction.
pub fn backward_jump(target: usize, at: usize) -> Vec<u8> {
    let offset = target as i64 - (at as i64 + 3);
    if (-256..=-1).contains(&offset) {
        vec![opcode::JUMP_SHORT, ((offset + 1) & 0xFF) as u8]
    } else {
        let word = (offset as i16 as u16).to_le_bytes();
        vec![opcode::JUMP_LONG, word[0], word[1]]
    }
}
