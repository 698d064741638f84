//! Image assembly

use super::{CHANNEL_COUNT, HEADER_SIZE};
use crate::error::{Error, Result};

/// Highest address + 1 the driver can see
const ADDRESS_SPACE: usize = 0x10000;

/// Concatenate channel bytecode behind a header of absolute start addresses.
///
/// Header words 0-2 hold `base_address + offset` of each channel; bytes 6-7
/// are zero. Channel data follows in order from offset 8.
pub fn assemble(channels: [&[u8]; CHANNEL_COUNT], base_address: u16) -> Result<Vec<u8>> {
    let total = HEADER_SIZE + channels.iter().map(|c| c.len()).sum::<usize>();
    if usize::from(base_address) + total > ADDRESS_SPACE {
        return Err(Error::Image(format!(
            "{} bytes at ${:04X} exceed the 64K address space",
            total, base_address
        )));
    }

    let mut image = vec![0u8; HEADER_SIZE];
    image.reserve(total - HEADER_SIZE);
    for (i, data) in channels.iter().enumerate() {
        let address = u16::try_from(usize::from(base_address) + image.len())
            .map_err(|_| Error::Image(format!("channel {} starts beyond $FFFF", i + 1)))?;
        image[i * 2..i * 2 + 2].copy_from_slice(&address.to_le_bytes());
        image.extend_from_slice(data);
    }

    Ok(image)
}
