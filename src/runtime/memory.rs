//! Guest linear memory
//!
//! The runtime owns a single growable byte buffer that guest code addresses
//! with 32-bit offsets. The host gets direct views of it through
//! [`Runtime::memory_data`](super::Runtime::memory_data); those views are
//! borrows of the runtime and therefore cannot outlive the next call, which
//! may grow (and relocate) the buffer.
//!
//! Layout follows WebAssembly:
//! - Page size: 64KB (65,536 bytes)
//! - Address space: 32-bit (max 4GB)
//! - Out-of-bounds access: [`Trap::OutOfBoundsMemory`]

use super::{RuntimeError, Trap};
use byteorder::{ByteOrder, LittleEndian};

/// WebAssembly page size in bytes (64KB)
pub const PAGE_SIZE: usize = 65536;

/// Maximum number of pages (2^16 = 64K pages = 4GB total)
pub const MAX_PAGES: u32 = 65536;

/// A linear memory instance
#[derive(Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
    current_pages: u32,
    max_pages: Option<u32>,
}

impl Memory {
    /// Create a new memory instance with the given limits
    ///
    /// # Errors
    /// - Initial pages exceeds maximum
    /// - Initial or maximum pages exceeds the 4GB address space
    pub fn new(initial_pages: u32, max_pages: Option<u32>) -> Result<Self, RuntimeError> {
        if initial_pages > MAX_PAGES {
            return Err(RuntimeError::MemoryError(format!(
                "Initial memory size {initial_pages} pages exceeds maximum {MAX_PAGES} pages"
            )));
        }

        if let Some(max) = max_pages {
            if initial_pages > max {
                return Err(RuntimeError::MemoryError(format!(
                    "Initial size {initial_pages} pages exceeds specified maximum {max} pages"
                )));
            }
            if max > MAX_PAGES {
                return Err(RuntimeError::MemoryError(format!(
                    "Maximum size {max} pages exceeds system maximum {MAX_PAGES} pages"
                )));
            }
        }

        Ok(Memory {
            data: vec![0u8; initial_pages as usize * PAGE_SIZE],
            current_pages: initial_pages,
            max_pages,
        })
    }

    /// Current size in pages
    pub fn size(&self) -> u32 {
        self.current_pages
    }

    /// Maximum size in pages (None = bounded only by the address space)
    pub fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }

    /// Current length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The live backing buffer
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The live backing buffer, writable
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Apply a module's declared limits: grow to at least `min` pages and
    /// adopt the tighter of the existing and declared maximum.
    pub fn apply_limits(&mut self, min: u32, max: Option<u32>) -> Result<(), RuntimeError> {
        let max = match (self.max_pages, max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let Some(max) = max {
            if min > max || max > MAX_PAGES {
                return Err(RuntimeError::MemoryError(format!(
                    "memory limits min={min} max={max} cannot be satisfied"
                )));
            }
            if self.current_pages > max {
                return Err(RuntimeError::MemoryError(format!(
                    "maximum {max} pages is below the current size of {} pages",
                    self.current_pages
                )));
            }
        }
        self.max_pages = max;
        if min > self.current_pages && self.grow(min - self.current_pages) < 0 {
            return Err(RuntimeError::MemoryError(format!("failed to grow memory to {min} pages")));
        }
        Ok(())
    }

    /// Grow memory by the specified number of pages
    ///
    /// Returns the previous size in pages, or -1 if growth fails. Growth may
    /// move the backing buffer.
    pub fn grow(&mut self, delta_pages: u32) -> i32 {
        let current = self.current_pages;

        let Some(new_pages) = current.checked_add(delta_pages) else {
            return -1;
        };

        if new_pages > self.max_pages.unwrap_or(MAX_PAGES) {
            return -1;
        }

        let new_bytes = new_pages as usize * PAGE_SIZE;
        match self.data.try_reserve(new_bytes - self.data.len()) {
            Ok(()) => {
                self.data.resize(new_bytes, 0);
                self.current_pages = new_pages;
                current as i32
            }
            Err(_) => -1,
        }
    }

    /// Check an access of `size` bytes at `addr`, returning the start index
    #[inline]
    fn check_bounds(&self, addr: u32, size: usize) -> Result<usize, Trap> {
        let start = addr as usize;
        match start.checked_add(size) {
            Some(end) if end <= self.data.len() => Ok(start),
            _ => Err(Trap::OutOfBoundsMemory { addr, size }),
        }
    }

    /// Borrow `len` bytes at `addr` without copying
    pub fn slice(&self, addr: u32, len: usize) -> Result<&[u8], Trap> {
        let start = self.check_bounds(addr, len)?;
        Ok(&self.data[start..start + len])
    }

    /// Mutably borrow `len` bytes at `addr` without copying
    pub fn slice_mut(&mut self, addr: u32, len: usize) -> Result<&mut [u8], Trap> {
        let start = self.check_bounds(addr, len)?;
        Ok(&mut self.data[start..start + len])
    }

    pub fn read_u8(&self, addr: u32) -> Result<u8, Trap> {
        let addr = self.check_bounds(addr, 1)?;
        Ok(self.data[addr])
    }

    pub fn read_u16(&self, addr: u32) -> Result<u16, Trap> {
        Ok(LittleEndian::read_u16(self.slice(addr, 2)?))
    }

    pub fn read_u32(&self, addr: u32) -> Result<u32, Trap> {
        Ok(LittleEndian::read_u32(self.slice(addr, 4)?))
    }

    pub fn read_u64(&self, addr: u32) -> Result<u64, Trap> {
        Ok(LittleEndian::read_u64(self.slice(addr, 8)?))
    }

    pub fn read_i32(&self, addr: u32) -> Result<i32, Trap> {
        Ok(LittleEndian::read_i32(self.slice(addr, 4)?))
    }

    pub fn read_i64(&self, addr: u32) -> Result<i64, Trap> {
        Ok(LittleEndian::read_i64(self.slice(addr, 8)?))
    }

    pub fn read_f32(&self, addr: u32) -> Result<f32, Trap> {
        Ok(LittleEndian::read_f32(self.slice(addr, 4)?))
    }

    pub fn read_f64(&self, addr: u32) -> Result<f64, Trap> {
        Ok(LittleEndian::read_f64(self.slice(addr, 8)?))
    }

    pub fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), Trap> {
        let addr = self.check_bounds(addr, 1)?;
        self.data[addr] = value;
        Ok(())
    }

    pub fn write_u16(&mut self, addr: u32, value: u16) -> Result<(), Trap> {
        LittleEndian::write_u16(self.slice_mut(addr, 2)?, value);
        Ok(())
    }

    pub fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), Trap> {
        LittleEndian::write_u32(self.slice_mut(addr, 4)?, value);
        Ok(())
    }

    pub fn write_u64(&mut self, addr: u32, value: u64) -> Result<(), Trap> {
        LittleEndian::write_u64(self.slice_mut(addr, 8)?, value);
        Ok(())
    }

    pub fn write_i32(&mut self, addr: u32, value: i32) -> Result<(), Trap> {
        LittleEndian::write_i32(self.slice_mut(addr, 4)?, value);
        Ok(())
    }

    pub fn write_i64(&mut self, addr: u32, value: i64) -> Result<(), Trap> {
        LittleEndian::write_i64(self.slice_mut(addr, 8)?, value);
        Ok(())
    }

    pub fn write_f32(&mut self, addr: u32, value: f32) -> Result<(), Trap> {
        LittleEndian::write_f32(self.slice_mut(addr, 4)?, value);
        Ok(())
    }

    pub fn write_f64(&mut self, addr: u32, value: f64) -> Result<(), Trap> {
        LittleEndian::write_f64(self.slice_mut(addr, 8)?, value);
        Ok(())
    }

    /// Copy `len` bytes out of memory
    pub fn read_bytes(&self, addr: u32, len: usize) -> Result<Vec<u8>, Trap> {
        Ok(self.slice(addr, len)?.to_vec())
    }

    /// Copy a slice of bytes into memory
    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), Trap> {
        self.slice_mut(addr, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_creation() {
        let mem = Memory::new(1, None).unwrap();
        assert_eq!(mem.size(), 1);
        assert_eq!(mem.len(), PAGE_SIZE);

        let mem = Memory::new(1, Some(10)).unwrap();
        assert_eq!(mem.max_pages(), Some(10));

        let mem = Memory::default();
        assert!(mem.is_empty());
        assert_eq!(mem.size(), 0);
    }

    #[test]
    fn test_memory_creation_errors() {
        assert!(Memory::new(10, Some(5)).is_err());
        assert!(Memory::new(MAX_PAGES + 1, None).is_err());
        assert!(Memory::new(1, Some(MAX_PAGES + 1)).is_err());
    }

    #[test]
    fn test_memory_grow() {
        let mut mem = Memory::new(1, Some(10)).unwrap();

        assert_eq!(mem.grow(2), 1);
        assert_eq!(mem.size(), 3);
        assert_eq!(mem.len(), 3 * PAGE_SIZE);

        assert_eq!(mem.grow(7), 3);
        assert_eq!(mem.size(), 10);

        assert_eq!(mem.grow(1), -1);
        assert_eq!(mem.size(), 10);
    }

    #[test]
    fn test_memory_grow_overflow() {
        let mut mem = Memory::new(1, None).unwrap();
        assert_eq!(mem.grow(u32::MAX), -1);
        assert_eq!(mem.size(), 1);
    }

    #[test]
    fn test_apply_limits() {
        let mut mem = Memory::default();
        mem.apply_limits(2, Some(4)).unwrap();
        assert_eq!(mem.size(), 2);
        assert_eq!(mem.max_pages(), Some(4));

        // A later, smaller declaration does not shrink
        mem.apply_limits(1, None).unwrap();
        assert_eq!(mem.size(), 2);
        assert_eq!(mem.max_pages(), Some(4));

        assert!(mem.apply_limits(5, None).is_err());
    }

    #[test]
    fn test_apply_limits_max_below_current_size() {
        let mut mem = Memory::default();
        mem.apply_limits(3, None).unwrap();

        assert!(matches!(mem.apply_limits(1, Some(2)), Err(RuntimeError::MemoryError(_))));
        // Rejected limits leave memory untouched
        assert_eq!(mem.size(), 3);
        assert_eq!(mem.max_pages(), None);
        assert_eq!(mem.grow(0), 3);

        // A maximum equal to the current size is fine
        mem.apply_limits(1, Some(3)).unwrap();
        assert_eq!(mem.max_pages(), Some(3));
        assert_eq!(mem.grow(0), 3);
        assert_eq!(mem.grow(1), -1);
    }

    #[test]
    fn test_bounds_checking() {
        let mem = Memory::new(1, None).unwrap();

        assert!(mem.check_bounds(0, 1).is_ok());
        assert!(mem.check_bounds(PAGE_SIZE as u32 - 1, 1).is_ok());
        assert!(mem.check_bounds(0, PAGE_SIZE).is_ok());

        assert!(mem.check_bounds(PAGE_SIZE as u32, 1).is_err());
        assert!(mem.check_bounds(PAGE_SIZE as u32 - 1, 2).is_err());
        assert!(mem.check_bounds(u32::MAX, 1).is_err());
        assert!(mem.check_bounds(u32::MAX, usize::MAX).is_err());
    }

    #[test]
    fn test_out_of_bounds_trap() {
        let mem = Memory::new(1, None).unwrap();
        assert_eq!(
            mem.read_u32(PAGE_SIZE as u32 - 3),
            Err(Trap::OutOfBoundsMemory {
                addr: PAGE_SIZE as u32 - 3,
                size: 4
            })
        );
    }

    #[test]
    fn test_read_write_u32() {
        let mut mem = Memory::new(1, None).unwrap();

        mem.write_u32(100, 0x12345678).unwrap();
        assert_eq!(mem.read_u32(100).unwrap(), 0x12345678);

        // Little-endian storage
        assert_eq!(mem.read_u8(100).unwrap(), 0x78);
        assert_eq!(mem.read_u8(103).unwrap(), 0x12);
        assert_eq!(mem.read_u16(100).unwrap(), 0x5678);

        mem.write_u32(PAGE_SIZE as u32 - 4, 0xDEADBEEF).unwrap();
        assert_eq!(mem.read_u32(PAGE_SIZE as u32 - 4).unwrap(), 0xDEADBEEF);

        assert!(mem.write_u32(PAGE_SIZE as u32 - 3, 1).is_err());
    }

    #[test]
    fn test_signed_and_float() {
        let mut mem = Memory::new(1, None).unwrap();

        mem.write_i32(10, i32::MIN).unwrap();
        assert_eq!(mem.read_i32(10).unwrap(), i32::MIN);
        mem.write_i64(20, -7).unwrap();
        assert_eq!(mem.read_i64(20).unwrap(), -7);
        assert_eq!(mem.read_u64(20).unwrap(), (-7i64) as u64);

        mem.write_f32(40, std::f32::consts::PI).unwrap();
        assert_eq!(mem.read_f32(40).unwrap(), std::f32::consts::PI);
        mem.write_f64(48, std::f64::consts::E).unwrap();
        assert_eq!(mem.read_f64(48).unwrap(), std::f64::consts::E);
    }

    #[test]
    fn test_bytes_operations() {
        let mut mem = Memory::new(1, None).unwrap();

        mem.write_bytes(100, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(mem.read_bytes(100, 5).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(&mem.data()[100..105], &[1, 2, 3, 4, 5]);

        mem.slice_mut(100, 2).unwrap().fill(9);
        assert_eq!(mem.slice(100, 3).unwrap(), &[9, 9, 3]);

        assert!(mem.read_bytes(200, 0).unwrap().is_empty());
        assert!(mem.write_bytes(PAGE_SIZE as u32 - 5, &[0; 10]).is_err());
    }

    #[test]
    fn test_grow_preserves_and_zeroes() {
        let mut mem = Memory::new(1, None).unwrap();
        mem.write_u32(0, 0xDEADBEEF).unwrap();

        mem.grow(1);

        assert_eq!(mem.read_u32(0).unwrap(), 0xDEADBEEF);
        assert_eq!(mem.read_u32(PAGE_SIZE as u32).unwrap(), 0);
    }
}
