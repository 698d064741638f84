//! Driver bytecode reader

use super::commands::{decode_sign_byte, DriverCommand, Instruction, NoteLength};
use super::opcode;
use super::{CHANNEL_COUNT, CHANNEL_NAMES, HEADER_SIZE};
use crate::error::{Error, Result};

/// Reader over one channel's bytecode
pub struct ChannelReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ChannelReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Check if we've reached the end of data
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::Decode(format!("unexpected end of data at {}", self.pos)))?;
        self.pos += 1;
        Ok(b)
    }

    /// Read a 16-bit little-endian value
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let lo = self.read_u8()? as u16;
        let hi = self.read_u8()? as u16;
        Ok(lo | (hi << 8))
    }

    /// Decode commands up to and including the end marker
    pub fn parse_commands(&mut self) -> Result<Vec<Instruction>> {
        let mut commands = Vec::new();
        while let Some(insn) = self.parse_command()? {
            let is_end = matches!(insn.command, DriverCommand::End);
            commands.push(insn);
            if is_end {
                break;
            }
        }
        Ok(commands)
    }

    /// Decode a single command
    pub fn parse_command(&mut self) -> Result<Option<Instruction>> {
        if self.is_eof() {
            return Ok(None);
        }

        let offset = self.pos;
        let op = self.read_u8()?;

        let command = match op {
            0x00..=0x7F => self.parse_note(op)?,
            0x80..=0x8F => DriverCommand::Octave { octave: op & 0x0F },
            0x90..=0x9F => DriverCommand::Volume { volume: op & 0x0F },
            0xA0..=0xAF => DriverCommand::VolumeDown { amount: op & 0x0F },
            0xB0..=0xBF => DriverCommand::VolumeUp { amount: op & 0x0F },
            opcode::HALT => DriverCommand::Halt,
            opcode::ENVELOPE => {
                let n1 = self.read_u8()?;
                if n1 == 0 {
                    DriverCommand::EnvelopeOff
                } else {
                    let n2 = self.read_u8()?;
                    let n3 = self.read_u8()?;
                    let n4 = self.read_u8()?;
                    let n5 = decode_sign_byte(self.read_u8()?);
                    DriverCommand::Envelope { n1, n2, n3, n4, n5 }
                }
            }
            opcode::NOISE_FREQ => DriverCommand::NoiseFrequency {
                value: self.read_u8()?,
            },
            opcode::NOISE_FREQ_REL => DriverCommand::NoiseFrequencyRelative {
                delta: self.read_u8()? as i8,
            },
            0xED..=0xEF => DriverCommand::NoiseMode {
                mode: op - opcode::NOISE_MODE + 1,
            },
            opcode::LOOP_START => DriverCommand::LoopStart {
                count: self.read_u8()?,
            },
            opcode::JUMP_SHORT => {
                let offset = i16::from(self.read_u8()?) - 256;
                let target = self.relative(offset.into())?;
                DriverCommand::JumpShort { offset, target }
            }
            opcode::JUMP_LONG => {
                let offset = self.read_u16_le()? as i16;
                let target = self.relative(offset.into())?;
                DriverCommand::JumpLong { offset, target }
            }
            opcode::LOOP_EXIT => {
                let offset = self.read_u16_le()?;
                let target = self.relative(offset.into())?;
                DriverCommand::LoopExit { offset, target }
            }
            opcode::WORK => DriverCommand::Work {
                value: self.read_u8()?,
            },
            opcode::VIBRATO => {
                let n1 = self.read_u8()?;
                let n2 = self.read_u8()?;
                let n3 = self.read_u8()?;
                let depth = decode_sign_byte(self.read_u8()?);
                DriverCommand::Vibrato { n1, n2, n3, depth }
            }
            opcode::VIBRATO_TOGGLE => DriverCommand::VibratoToggle,
            opcode::PLUS_LENGTH => DriverCommand::PlusLength {
                ticks: self.read_u8()?,
            },
            opcode::TEMPO => {
                let n1 = self.read_u8()?;
                let n2 = self.read_u8()?;
                DriverCommand::Tempo { n1, n2 }
            }
            opcode::LENGTH => DriverCommand::Length {
                ticks: self.read_u8()?,
            },
            opcode::GATE => DriverCommand::Gate {
                value: self.read_u8()?,
            },
            opcode::DETUNE => DriverCommand::Detune {
                value: decode_sign_byte(self.read_u8()?),
            },
            opcode::DETUNE_REL => DriverCommand::DetuneRelative {
                delta: self.read_u8()? as i8,
            },
            opcode::VIBRATO_DEPTH => DriverCommand::VibratoDepth {
                depth: decode_sign_byte(self.read_u8()?),
            },
            opcode::LOOP_POINT => DriverCommand::LoopPoint,
            opcode::END => DriverCommand::End,
            _ => {
                return Err(Error::Decode(format!(
                    "unknown opcode 0x{:02X} at {}",
                    op, offset
                )))
            }
        };

        Ok(Some(Instruction { offset, command }))
    }

    fn parse_note(&mut self, header: u8) -> Result<DriverCommand> {
        let tie = header & opcode::NOTE_TIE != 0;
        let tone = header & opcode::NOTE_TONE_MASK;
        let length = match (header >> opcode::NOTE_CLASS_SHIFT) & 3 {
            0 => NoteLength::Default,
            1 => NoteLength::Plus,
            2 => NoteLength::Ticks(self.read_u8()?.into()),
            _ => NoteLength::Ticks(self.read_u16_le()?),
        };
        if tone == 0 {
            Ok(DriverCommand::Rest { length, tie })
        } else if tone <= 12 {
            Ok(DriverCommand::Note { tone, length, tie })
        } else {
            Err(Error::Decode(format!("invalid tone {} in note header", tone)))
        }
    }

    /// Resolve an offset relative to the current position
    fn relative(&self, offset: i64) -> Result<usize> {
        let target = self.pos as i64 + offset;
        if target < 0 || target as usize > self.data.len() {
            return Err(Error::Decode(format!(
                "jump at {} leaves the channel data",
                self.pos
            )));
        }
        Ok(target as usize)
    }
}

/// One channel of an assembled image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelData {
    pub name: char,
    /// Absolute start address as stored in the header
    pub start_address: u16,
    pub bytes: Vec<u8>,
}

/// An assembled image split back into channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub base_address: u16,
    pub channels: Vec<ChannelData>,
}

impl Image {
    /// Split an image using the start addresses in its header.
    ///
    /// The first channel always follows the header, so the base address is
    /// its start address minus the header size.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Decode("file too small for image header".into()));
        }
        let mut header = ChannelReader::new(&data[..HEADER_SIZE]);
        let mut addresses = [0u16; CHANNEL_COUNT];
        for address in &mut addresses {
            *address = header.read_u16_le()?;
        }

        let base_address = addresses[0]
            .checked_sub(HEADER_SIZE as u16)
            .ok_or_else(|| Error::Decode("first channel address lies inside the header".into()))?;

        let mut starts = [0usize; CHANNEL_COUNT];
        for (start, &address) in starts.iter_mut().zip(&addresses) {
            *start = address
                .checked_sub(base_address)
                .ok_or_else(|| Error::Decode(format!("channel address ${:04X} below base", address)))?
                as usize;
        }

        let mut channels = Vec::with_capacity(CHANNEL_COUNT);
        for i in 0..CHANNEL_COUNT {
            let start = starts[i];
            let end = starts.get(i + 1).copied().unwrap_or(data.len());
            if start > end || end > data.len() {
                return Err(Error::Decode(format!(
                    "channel {} spans {}..{} outside the image",
                    CHANNEL_NAMES[i], start, end
                )));
            }
            channels.push(ChannelData {
                name: CHANNEL_NAMES[i],
                start_address: addresses[i],
                bytes: data[start..end].to_vec(),
            });
        }

        Ok(Self {
            base_address,
            channels,
        })
    }
}
