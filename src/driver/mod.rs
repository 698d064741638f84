//! The playback driver's side of the format: opcodes, images, decoding

pub mod commands;
pub mod json;
pub mod opcode;
pub mod reader;
pub mod writer;

pub use commands::{DriverCommand, Instruction, NoteLength};
pub use json::ImageJson;
pub use reader::{ChannelData, ChannelReader, Image};
pub use writer::assemble;

/// Number of PSG voices
pub const CHANNEL_COUNT: usize = 3;

/// Channel letters used in MML source, one per voice
pub const CHANNEL_NAMES: [char; CHANNEL_COUNT] = ['D', 'E', 'F'];

/// Size of the image header (three start addresses and two reserved bytes)
pub const HEADER_SIZE: usize = 8;
