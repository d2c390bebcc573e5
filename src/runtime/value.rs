//! Value kinds and the stack-slot marshaler
//!
//! Every argument and return value crosses the host/guest boundary as a raw
//! 64-bit stack slot. This module converts between typed [`Value`]s and those
//! slots according to a function's declared [`ValueKind`]s.

use fhex::ToHex;
use std::fmt;

/// The value kinds a function signature can mention
///
/// `None` only appears as a return kind and means the function returns nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    I32,
    I64,
    F32,
    F64,
    None,
}

impl ValueKind {
    /// Signature character for this kind (see [`FuncType::signature`](super::FuncType::signature))
    pub fn signature_char(self) -> char {
        match self {
            ValueKind::I32 => 'i',
            ValueKind::I64 => 'I',
            ValueKind::F32 => 'f',
            ValueKind::F64 => 'F',
            ValueKind::None => 'v',
        }
    }

    /// Parse a signature character. Guest pointers (`*`) are 32-bit offsets.
    pub fn from_signature_char(c: char) -> Option<Self> {
        match c {
            'i' | '*' => Some(ValueKind::I32),
            'I' => Some(ValueKind::I64),
            'f' => Some(ValueKind::F32),
            'F' => Some(ValueKind::F64),
            'v' => Some(ValueKind::None),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::None => "none",
        };
        f.write_str(name)
    }
}

/// A typed value passed to or returned from the guest
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// Get the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
        }
    }

    /// Convert to i32, returning None if wrong type
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to i64, returning None if wrong type
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f32, returning None if wrong type
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f64, returning None if wrong type
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Encode into a raw stack slot
    ///
    /// 32-bit values occupy the low half of the slot with the high half zeroed;
    /// floats are stored by bit pattern.
    pub fn to_slot(self) -> u64 {
        match self {
            Value::I32(v) => v as u32 as u64,
            Value::I64(v) => v as u64,
            Value::F32(v) => v.to_bits() as u64,
            Value::F64(v) => v.to_bits(),
        }
    }

    /// Decode a raw stack slot as the given kind
    ///
    /// Returns None for [`ValueKind::None`].
    pub fn from_slot(kind: ValueKind, slot: u64) -> Option<Self> {
        match kind {
            ValueKind::I32 => Some(Value::I32(slot as u32 as i32)),
            ValueKind::I64 => Some(Value::I64(slot as i64)),
            ValueKind::F32 => Some(Value::F32(f32::from_bits(slot as u32))),
            ValueKind::F64 => Some(Value::F64(f64::from_bits(slot))),
            ValueKind::None => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{}", v.to_hex()),
            Value::F64(v) => write!(f, "f64:{}", v.to_hex()),
        }
    }
}
