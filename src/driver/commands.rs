//! Decoded driver commands

use serde::Serialize;

/// How a note's length is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteLength {
    /// Current `L` length
    Default,
    /// Current `L+` length
    Plus,
    /// Explicit tick count
    Ticks(u16),
}

/// A decoded driver command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DriverCommand {
    Note { tone: u8, length: NoteLength, tie: bool },
    Rest { length: NoteLength, tie: bool },
    Octave { octave: u8 },
    Volume { volume: u8 },
    VolumeUp { amount: u8 },
    VolumeDown { amount: u8 },
    Halt,
    EnvelopeOff,
    Envelope { n1: u8, n2: u8, n3: u8, n4: u8, n5: i8 },
    NoiseFrequency { value: u8 },
    NoiseFrequencyRelative { delta: i8 },
    NoiseMode { mode: u8 },
    LoopStart { count: u8 },
    /// `F1 xx`: offset is -256..=-1 from the end of the instruction
    JumpShort { offset: i16, target: usize },
    /// `F2 lo hi`: signed offset from the end of the instruction
    JumpLong { offset: i16, target: usize },
    /// `F3 lo hi`: taken on the last iteration
    LoopExit { offset: u16, target: usize },
    Work { value: u8 },
    Vibrato { n1: u8, n2: u8, n3: u8, depth: i8 },
    VibratoToggle,
    PlusLength { ticks: u8 },
    Tempo { n1: u8, n2: u8 },
    Length { ticks: u8 },
    Gate { value: u8 },
    Detune { value: i8 },
    DetuneRelative { delta: i8 },
    VibratoDepth { depth: i8 },
    LoopPoint,
    End,
}

/// A command and the channel-local offset of its opcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub offset: usize,
    #[serde(flatten)]
    pub command: DriverCommand,
}

impl DriverCommand {
    /// Check if this is a note or rest
    pub fn is_note(&self) -> bool {
        matches!(self, DriverCommand::Note { .. } | DriverCommand::Rest { .. })
    }

    /// Get the jump destination of a jump or loop exit
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            DriverCommand::JumpShort { target, .. }
            | DriverCommand::JumpLong { target, .. }
            | DriverCommand::LoopExit { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// Decode a signed-magnitude byte (bit 7 sign, bits 6-0 magnitude)
pub fn decode_sign_byte(b: u8) -> i8 {
    let magnitude = (b & 0x7F) as i8;
    if b & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}
