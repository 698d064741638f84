//! Capacity-bounded output buffer

use crate::error::{ErrorKind, Fault};

/// Append-only byte buffer with in-place patching of earlier bytes
#[derive(Debug, Clone)]
pub struct Output {
    bytes: Vec<u8>,
    capacity: usize,
}

impl Output {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::new(),
            capacity,
        }
    }

    /// Append `data` entirely, or nothing if it would exceed the capacity
    pub fn write(&mut self, data: &[u8]) -> Result<(), Fault> {
        if self.bytes.len() + data.len() > self.capacity {
            return Err(Fault::new(
                ErrorKind::Internal,
                "compiled output exceeds the buffer size",
            ));
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Overwrite already written bytes starting at `at`
    pub fn patch(&mut self, at: usize, data: &[u8]) -> Result<(), Fault> {
        let slot = self
            .bytes
            .get_mut(at..at + data.len())
            .ok_or_else(|| Fault::new(ErrorKind::Internal, "backpatch outside of written output"))?;
        slot.copy_from_slice(data);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}
