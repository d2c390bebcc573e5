//! Function types and their compact signature strings
//!
//! Host linking describes a function type as a return character followed by
//! the argument characters in parentheses, e.g. `i(ii)` for
//! `(i32, i32) -> i32` or `v(*I)` for `(ptr, i64) -> ()`.

use super::{RuntimeError, ValueKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([viIfF])\s*\(\s*([iIfF*\s]*)\)\s*$").expect("signature pattern is valid")
});

/// A function's declared argument kinds and single return kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncType {
    params: Vec<ValueKind>,
    result: ValueKind,
}

impl FuncType {
    /// Create a function type. A `ValueKind::None` parameter is not meaningful
    /// and is dropped.
    pub fn new(params: impl IntoIterator<Item = ValueKind>, result: ValueKind) -> Self {
        FuncType {
            params: params.into_iter().filter(|k| *k != ValueKind::None).collect(),
            result,
        }
    }

    /// Parse a signature string such as `i(ii)`
    pub fn parse(signature: &str) -> Result<Self, RuntimeError> {
        let captures = SIGNATURE
            .captures(signature)
            .ok_or_else(|| RuntimeError::InvalidSignature(signature.to_string()))?;

        let result = captures
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(ValueKind::from_signature_char)
            .ok_or_else(|| RuntimeError::InvalidSignature(signature.to_string()))?;

        let params = captures
            .get(2)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| ValueKind::from_signature_char(c).ok_or_else(|| RuntimeError::InvalidSignature(signature.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FuncType { params, result })
    }

    pub fn params(&self) -> &[ValueKind] {
        &self.params
    }

    pub fn num_args(&self) -> usize {
        self.params.len()
    }

    /// Kind of the argument at `index`, if there is one
    pub fn arg_type(&self, index: usize) -> Option<ValueKind> {
        self.params.get(index).copied()
    }

    pub fn return_type(&self) -> ValueKind {
        self.result
    }

    /// Whether every argument is an i32 and the result is an i32 or nothing
    pub fn is_i32_only(&self) -> bool {
        self.params.iter().all(|k| *k == ValueKind::I32) && matches!(self.result, ValueKind::I32 | ValueKind::None)
    }

    /// Render the canonical signature string
    pub fn signature(&self) -> String {
        let mut s = String::with_capacity(self.params.len() + 3);
        s.push(self.result.signature_char());
        s.push('(');
        s.extend(self.params.iter().map(|k| k.signature_char()));
        s.push(')');
        s
    }
}

impl FromStr for FuncType {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FuncType::parse(s)
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}
