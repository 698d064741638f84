//! JSON serialization types for compiled images

use super::commands::Instruction;
use super::reader::{ChannelReader, Image};
use crate::error::Result;
use serde::Serialize;

/// Top-level JSON structure for an image
#[derive(Debug, Clone, Serialize)]
pub struct ImageJson {
    pub base_address: u16,
    pub channels: Vec<ChannelJson>,
}

/// JSON representation of one channel
#[derive(Debug, Clone, Serialize)]
pub struct ChannelJson {
    pub name: char,
    pub start_address: u16,
    /// Length in bytes, end marker included
    pub length: usize,
    pub commands: Vec<Instruction>,
}

impl ImageJson {
    pub fn new(image: &Image) -> Result<Self> {
        let channels = image
            .channels
            .iter()
            .map(|channel| {
                Ok(ChannelJson {
                    name: channel.name,
                    start_address: channel.start_address,
                    length: channel.bytes.len(),
                    commands: ChannelReader::new(&channel.bytes).parse_commands()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            base_address: image.base_address,
            channels,
        })
    }
}
