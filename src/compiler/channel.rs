//! Per-channel compiler state and the line compiler

use super::command;
use super::cursor::Cursor;
use super::nest::NestStack;
use super::note;
use super::output::Output;
use crate::driver::opcode;
use crate::error::{CompileError, ErrorKind, Fault};

/// Default `L` length in ticks (quarter note)
pub const DEFAULT_LENGTH: u16 = 24;
/// Default `L+` length in ticks (two whole notes)
pub const DEFAULT_PLUS_LENGTH: u16 = 192;
/// Octave the driver starts in
pub const DEFAULT_OCTAVE: u8 = 4;

/// State carried across all lines of a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    /// `L` length in ticks
    pub default_len: u16,
    /// `L+` length in ticks
    pub plus_len: u16,
    /// Octave selected by `O`, `>` and `<`
    pub octave: u8,
    /// Octave last written to the output stream
    pub octave_last: u8,
    /// Semitone transposition (`_`)
    pub key_shift: i8,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            default_len: DEFAULT_LENGTH,
            plus_len: DEFAULT_PLUS_LENGTH,
            octave: DEFAULT_OCTAVE,
            octave_last: DEFAULT_OCTAVE,
            key_shift: 0,
        }
    }
}

/// Length and octave state saved at a loop exit marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub default_len: u16,
    pub plus_len: u16,
    pub octave: u8,
    pub octave_last: u8,
}

impl ChannelState {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            default_len: self.default_len,
            plus_len: self.plus_len,
            octave: self.octave,
            octave_last: self.octave_last,
        }
    }

    pub fn restore(&mut self, saved: &Snapshot) {
        self.default_len = saved.default_len;
        self.plus_len = saved.plus_len;
        self.octave = saved.octave;
        self.octave_last = saved.octave_last;
    }

    pub fn apply(&mut self, change: StateChange) {
        match change {
            StateChange::Octave(o) => self.octave = o,
            StateChange::EmittedOctave(o) => self.octave_last = o,
            StateChange::KeyShift(k) => self.key_shift = k,
            StateChange::DefaultLength(t) => self.default_len = t,
            StateChange::PlusLength(t) => self.plus_len = t,
            StateChange::Halt => {}
        }
    }
}

/// State mutation requested by a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Octave(u8),
    /// An octave byte was written
    EmittedOctave(u8),
    KeyShift(i8),
    DefaultLength(u16),
    PlusLength(u16),
    /// Stop compiling the channel
    Halt,
}

/// Result of one note or command: bytes to append and a state change.
///
/// Statements are fully validated before an `Effect` is produced, so
/// applying one never leaves a half-written instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effect {
    pub bytes: Vec<u8>,
    pub change: Option<StateChange>,
}

impl Effect {
    pub fn emit(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            change: None,
        }
    }

    pub fn change(change: StateChange) -> Self {
        Self {
            bytes: Vec::new(),
            change: Some(change),
        }
    }

    pub fn with_change(bytes: &[u8], change: StateChange) -> Self {
        Self {
            bytes: bytes.to_vec(),
            change: Some(change),
        }
    }
}

/// Compiles the lines of one channel into driver bytecode
#[derive(Debug, Clone)]
pub struct ChannelCompiler {
    state: ChannelState,
    nest: NestStack,
    output: Output,
    halted: bool,
    finished: bool,
    /// Last line handed to `compile_line`
    line: usize,
}

impl ChannelCompiler {
    /// Create a channel whose output may grow to `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            state: ChannelState::default(),
            nest: NestStack::new(),
            output: Output::new(capacity),
            halted: false,
            finished: false,
            line: 0,
        }
    }

    /// Compile one line, appending to the channel's output.
    ///
    /// Stops at the first error on the line. Lines after an `X` command are
    /// ignored.
    pub fn compile_line(&mut self, text: impl AsRef<[u8]>, line: usize) -> Result<(), CompileError> {
        if self.halted || self.finished {
            return Ok(());
        }
        self.line = line;

        let mut cur = Cursor::from_bytes(text.as_ref());
        loop {
            cur.skip_blanks();
            if cur.is_eof() || self.halted {
                break;
            }
            let column = cur.column();
            if let Err(fault) = self.compile_statement(&mut cur, line, column) {
                if is_structural(fault.kind) {
                    self.nest.reset();
                }
                return Err(fault.into_error(line, column));
            }
        }
        Ok(())
    }

    /// Finish the channel: check that every loop is closed and append the end marker
    pub fn finish(&mut self) -> Result<(), CompileError> {
        if self.finished {
            return Ok(());
        }
        if let Some((line, column)) = self.nest.innermost_origin() {
            return Err(CompileError {
                kind: ErrorKind::UnclosedNest,
                message: "channel ended inside an unclosed '['".into(),
                line,
                column,
            });
        }
        self.output
            .write(&[opcode::END])
            .map_err(|fault| fault.into_error(self.line, 1))?;
        self.finished = true;
        Ok(())
    }

    fn compile_statement(&mut self, cur: &mut Cursor, line: usize, column: usize) -> Result<(), Fault> {
        let Some(ch) = cur.bump() else {
            return Ok(());
        };
        let effect = match ch.to_ascii_uppercase() {
            b';' => {
                cur.skip_line();
                return Ok(());
            }
            b'\n' => return Ok(()),
            b'[' => return self.nest.open(&mut self.output, line, column),
            b':' => return self.nest.mark_exit(&mut self.output, &self.state),
            b']' => return self.nest.close(cur, &mut self.output, &mut self.state),
            letter @ (b'A'..=b'G' | b'R') => note::compile_note(letter, cur, &self.state)?,
            other => command::dispatch(other, cur, &self.state, self.nest.depth() > 0)?,
        };
        self.apply(effect)
    }

    fn apply(&mut self, effect: Effect) -> Result<(), Fault> {
        self.output.write(&effect.bytes)?;
        match effect.change {
            Some(StateChange::Halt) => self.halted = true,
            Some(change) => self.state.apply(change),
            None => {}
        }
        Ok(())
    }

    /// Compiled bytes so far
    pub fn bytes(&self) -> &[u8] {
        self.output.as_slice()
    }

    pub fn len(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn nest_depth(&self) -> usize {
        self.nest.depth()
    }

    /// True once an `X` command stopped the channel
    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

/// Errors after which the open loops can no longer be matched up
fn is_structural(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::NestingOverflow
            | ErrorKind::NestingUnderflow
            | ErrorKind::DuplicateExit
            | ErrorKind::ReturnInNest
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ChannelReader, DriverCommand};

    fn compile(lines: &[&str]) -> ChannelCompiler {
        let mut ch = ChannelCompiler::new(1024);
        for (i, line) in lines.iter().enumerate() {
            ch.compile_line(line, i + 1).unwrap();
        }
        ch
    }

    fn error(text: &str) -> (CompileError, ChannelCompiler) {
        let mut ch = ChannelCompiler::new(1024);
        let err = ch.compile_line(text, 1).unwrap_err();
        (err, ch)
    }

    #[test]
    fn test_scale() {
        let mut ch = compile(&["CDEFGAB"]);
        assert_eq!(ch.bytes(), &[1, 3, 5, 6, 8, 10, 12]);
        ch.finish().unwrap();
        assert_eq!(ch.bytes().last(), Some(&0xFF));
        assert_eq!(ch.len(), 8);
    }

    #[test]
    fn test_octave_written_once() {
        let ch = compile(&["O5 C", "C > C"]);
        assert_eq!(ch.bytes(), &[0x85, 0x01, 0x01, 0x86, 0x01]);
        assert_eq!(ch.state().octave_last, 6);
    }

    #[test]
    fn test_comment() {
        let ch = compile(&["C ; D E", "F"]);
        assert_eq!(ch.bytes(), &[0x01, 0x06]);
    }

    #[test]
    fn test_loop_decodes() {
        let mut ch = compile(&["[ C4 C4 ]3"]);
        ch.finish().unwrap();
        assert_eq!(ch.bytes(), &[0xF0, 3, 0x01, 0x01, 0xF1, 0xFC, 0xFF]);

        let insns = ChannelReader::new(ch.bytes()).parse_commands().unwrap();
        assert_eq!(insns[0].command, DriverCommand::LoopStart { count: 3 });
        assert_eq!(insns[3].command.jump_target(), Some(2));
    }

    #[test]
    fn test_loop_across_lines() {
        let ch = compile(&["[ C", ": D", "]2 E"]);
        let insns = ChannelReader::new(ch.bytes()).parse_commands().unwrap();
        let exit = insns
            .iter()
            .find(|i| matches!(i.command, DriverCommand::LoopExit { .. }))
            .unwrap();
        // lands on the E after the jump
        let target = exit.command.jump_target().unwrap();
        assert_eq!(ch.bytes()[target], 0x05);
        assert_eq!(ch.nest_depth(), 0);
    }

    #[test]
    fn test_exit_restores_state() {
        let ch = compile(&["[ L8 C : L16 O6 D ]3"]);
        assert_eq!(ch.state().default_len, 12);
        assert_eq!(ch.state().octave, 4);
    }

    #[test]
    fn test_octave_range() {
        assert_eq!(error("O9").0.kind, ErrorKind::OctaveRange);
        assert_eq!(error("O0").0.kind, ErrorKind::OctaveRange);
        assert_eq!(error("O8 >").0.kind, ErrorKind::OctaveRange);
    }

    #[test]
    fn test_nesting_overflow_resets() {
        let (err, ch) = error("[[[[[");
        assert_eq!(err.kind, ErrorKind::NestingOverflow);
        assert_eq!(err.column, 5);
        assert_eq!(ch.nest_depth(), 0);
    }

    #[test]
    fn test_nesting_errors() {
        assert_eq!(error("[ C : D : E ]2").0.kind, ErrorKind::DuplicateExit);
        assert_eq!(error("C ]2").0.kind, ErrorKind::NestingUnderflow);
        assert_eq!(error(": C").0.kind, ErrorKind::NestingUnderflow);
        assert_eq!(error("[ C ]1").0.kind, ErrorKind::ParameterRange);
        assert_eq!(error("[ J ]2").0.kind, ErrorKind::ReturnInNest);
    }

    #[test]
    fn test_parameter_range() {
        let (err, ch) = error("C C%256");
        assert_eq!(err.kind, ErrorKind::ParameterRange);
        assert_eq!(err.line, 1);
        assert_eq!(ch.bytes(), &[0x01]);
    }

    #[test]
    fn test_error_stops_line_only() {
        let mut ch = ChannelCompiler::new(1024);
        let err = ch.compile_line("C Z D", 4).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!((err.line, err.column), (4, 3));
        ch.compile_line("E", 5).unwrap();
        assert_eq!(ch.bytes(), &[0x01, 0x05]);
    }

    #[test]
    fn test_unclosed_nest() {
        let mut ch = ChannelCompiler::new(1024);
        ch.compile_line("C", 1).unwrap();
        ch.compile_line("  [ C [ D ]2", 2).unwrap();
        let err = ch.finish().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnclosedNest);
        assert_eq!((err.line, err.column), (2, 3));
    }

    #[test]
    fn test_finish_once() {
        let mut ch = compile(&["C"]);
        ch.finish().unwrap();
        ch.finish().unwrap();
        assert_eq!(ch.bytes(), &[0x01, 0xFF]);
        ch.compile_line("D", 2).unwrap();
        assert_eq!(ch.len(), 2);
    }

    #[test]
    fn test_halt_ignores_rest() {
        let ch = compile(&["C X D", "E"]);
        assert!(ch.is_halted());
        assert_eq!(ch.bytes(), &[0x01, 0xE9]);
    }

    #[test]
    fn test_capacity() {
        let mut ch = ChannelCompiler::new(2);
        let err = ch.compile_line("CDE", 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.column, 3);
        assert_eq!(ch.bytes(), &[0x01, 0x03]);
        assert_eq!(ch.finish().unwrap_err().kind, ErrorKind::Internal);
    }
}
