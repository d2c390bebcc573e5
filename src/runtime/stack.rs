//! The runtime's call stack
//!
//! A fixed-capacity array of 64-bit slots shared by every call made through a
//! [`Runtime`](super::Runtime). Arguments are written starting at slot 0 of a
//! frame and the return value is read back from slot 0. Nested calls use a
//! frame further up the same array, so recursion depth is bounded by capacity.

use super::{RuntimeError, Value, ValueKind};

/// Size of one stack slot in bytes
pub const SLOT_SIZE: usize = 8;

/// The shared slot stack
#[derive(Debug)]
pub struct Stack {
    slots: Box<[u64]>,
}

impl Stack {
    /// Create a stack holding `stack_size` bytes, rounded down to whole slots
    pub fn new(stack_size: usize) -> Result<Self, RuntimeError> {
        let capacity = stack_size / SLOT_SIZE;
        if capacity == 0 {
            return Err(RuntimeError::StackTooSmall { required: 1, capacity });
        }
        Ok(Stack {
            slots: vec![0u64; capacity].into_boxed_slice(),
        })
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Raw view of every slot
    pub fn slots(&self) -> &[u64] {
        &self.slots
    }

    /// Mutable raw view of every slot
    pub fn slots_mut(&mut self) -> &mut [u64] {
        &mut self.slots
    }

    /// Write a sequence of i32 arguments into slots 0..n
    ///
    /// Each value is written as a 32-bit word in the low half of its slot
    /// regardless of the declared argument kind.
    pub fn write_i32_args(&mut self, args: &[i32]) -> Result<(), RuntimeError> {
        self.check_fits(args.len())?;
        for (slot, arg) in self.slots.iter_mut().zip(args) {
            *slot = *arg as u32 as u64;
        }
        Ok(())
    }

    /// Write typed arguments into slots 0..n
    pub fn write_args(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        self.check_fits(args.len())?;
        for (slot, arg) in self.slots.iter_mut().zip(args) {
            *slot = arg.to_slot();
        }
        Ok(())
    }

    /// Read slot 0 as a 32-bit integer
    pub fn read_i32_return(&self) -> i32 {
        self.slots[0] as u32 as i32
    }

    /// Read slot 0 as the given kind
    pub fn read_return(&self, kind: ValueKind) -> Option<Value> {
        Value::from_slot(kind, self.slots[0])
    }

    fn check_fits(&self, count: usize) -> Result<(), RuntimeError> {
        if count > self.slots.len() {
            return Err(RuntimeError::StackTooSmall {
                required: count,
                capacity: self.slots.len(),
            });
        }
        Ok(())
    }
}
