//! WebAssembly embedding runtime
//!
//! This module holds the embedding contract between a host application and a
//! WebAssembly execution engine: the module/function directory, function
//! resolution, the call convention that moves values through the shared slot
//! stack, the host trampoline registry, and access to guest linear memory.

pub mod config;
pub mod engine;
pub mod invoke;
pub mod memory;
pub mod module;
pub mod resolve;
pub mod shared;
pub mod signature;
pub mod stack;
pub mod store;
pub mod test_utils;
pub mod trampoline;
pub mod value;

pub use config::Config;
pub use engine::{CallContext, CompiledCode, StackGuard};
pub use memory::Memory;
pub use module::{FuncRef, Function, ImportDescriptor, Module, ModuleBuilder, ModuleId};
pub use shared::SharedRuntime;
pub use signature::FuncType;
pub use stack::Stack;
pub use store::Runtime;
pub use trampoline::{HostFunc, Slot, TrampolineRegistry};
pub use value::{Value, ValueKind};

/// Abnormal termination signalled while executing guest code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Trap {
    #[error("program called exit (status {0})")]
    Exit(i32),
    #[error("unreachable executed")]
    Unreachable,
    #[error("out of bounds memory access: {size} bytes at {addr}")]
    OutOfBoundsMemory { addr: u32, size: usize },
    #[error("stack overflow")]
    StackOverflow,
    #[error("undefined function {module}:{index}")]
    UndefinedFunction { module: usize, index: u32 },
    #[error("undefined import {0}")]
    UndefinedImport(u32),
    #[error("unresolved import {module}.{field}")]
    UnresolvedImport { module: String, field: String },
    #[error("signature mismatch for {module}.{field}: import declares {expected}, host provides {actual}")]
    SignatureMismatch {
        module: String,
        field: String,
        expected: String,
        actual: String,
    },
    #[error("{0}")]
    Host(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Function not found: {module}.{function}")]
    NotFound { module: String, function: String },
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
    #[error("Unknown module: {0}")]
    UnknownModule(usize),
    #[error("Function index out of range: {0}")]
    IndexOutOfRange(u32),
    #[error("Trap: {0}")]
    ExecutionTrap(#[from] Trap),
    #[error("Unsupported signature for i32 call: {0}")]
    UnsupportedSignature(String),
    #[error("Argument count mismatch: expected {expected}, got {actual}")]
    ArgumentCountMismatch { expected: usize, actual: usize },
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("Invalid signature: {0:?}")]
    InvalidSignature(String),
    #[error("Duplicate module name: {0}")]
    DuplicateModule(String),
    #[error("Stack too small: {required} slots required, capacity is {capacity}")]
    StackTooSmall { required: usize, capacity: usize },
    #[error("Memory error: {0}")]
    MemoryError(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RuntimeError {
    /// The trap carried by an `ExecutionTrap`, if any
    pub fn trap(&self) -> Option<&Trap> {
        match self {
            RuntimeError::ExecutionTrap(trap) => Some(trap),
            _ => None,
        }
    }
}
