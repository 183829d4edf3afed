use std::{error::Error, fmt};

use crate::decoder::Size;

/// Size of the default backing store: the whole 24-bit bus.
pub const MEMORY_SIZE: usize = 0x0100_0000;

/// Every address is truncated to the 68000's 24 address lines before use.
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Sized, checked access to a big-endian address space.
///
/// Implementations must mask the address to 24 bits, reject word and long
/// accesses at odd addresses, and reject accesses that run past the end of
/// the store. A failing `set` leaves memory untouched.
pub trait AddressSpace {
    fn get(&self, addr: u32, size: Size) -> Result<u32, MemoryError>;

    fn set(&mut self, addr: u32, size: Size, value: u32) -> Result<(), MemoryError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flat heap-allocated byte array.
#[derive(Debug, Clone)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0; len],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Copy `bytes` to consecutive addresses starting at `addr`, one checked
    /// byte write at a time.
    pub fn load(&mut self, addr: u32, bytes: &[u8]) -> Result<(), MemoryError> {
        for (offset, byte) in bytes.iter().enumerate() {
            self.set(addr.wrapping_add(offset as u32), Size::Byte, *byte as u32)?;
        }
        Ok(())
    }

    fn range(&self, addr: u32, size: Size) -> Result<(usize, usize), MemoryError> {
        let masked = addr & ADDRESS_MASK;
        if size != Size::Byte && masked & 1 != 0 {
            return Err(MemoryError::Misaligned { addr: masked, size });
        }
        let start = masked as usize;
        let end = start + size.bytes() as usize;
        if end > self.data.len() {
            return Err(MemoryError::OutOfBounds {
                addr: masked,
                size,
                len: self.data.len(),
            });
        }
        Ok((start, end))
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(MEMORY_SIZE)
    }
}

impl AddressSpace for Memory {
    fn get(&self, addr: u32, size: Size) -> Result<u32, MemoryError> {
        let (start, end) = self.range(addr, size)?;
        let bytes = &self.data[start..end];
        Ok(match size {
            Size::Byte => bytes[0] as u32,
            Size::Word => u16::from_be_bytes([bytes[0], bytes[1]]) as u32,
            Size::Long => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }

    fn set(&mut self, addr: u32, size: Size, value: u32) -> Result<(), MemoryError> {
        let (start, end) = self.range(addr, size)?;
        let slice = &mut self.data[start..end];
        match size {
            Size::Byte => slice[0] = value as u8,
            Size::Word => slice.copy_from_slice(&(value as u16).to_be_bytes()),
            Size::Long => slice.copy_from_slice(&value.to_be_bytes()),
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    Misaligned { addr: u32, size: Size },
    OutOfBounds { addr: u32, size: Size, len: usize },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::Misaligned { addr, size } => {
                write!(f, "misaligned {} access at {addr:#08x}", size.name())
            }
            MemoryError::OutOfBounds { addr, size, len } => {
                let end = *addr as usize + size.bytes() as usize;
                write!(
                    f,
                    "{} access {addr:#08x}..{end:#08x} outside memory of {len:#x} bytes",
                    size.name()
                )
            }
        }
    }
}

impl Error for MemoryError {}
