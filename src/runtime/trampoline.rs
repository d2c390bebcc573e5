//! Host function trampolines
//!
//! Every host callback is registered under a (module, field, signature) triple
//! and receives a [`Slot`]: a small integer handed out in increasing order from
//! 0 and never reused. Imports bound to a slot all funnel through
//! [`TrampolineRegistry::dispatch`], which finds the callback by slot in
//! constant time, runs it, and turns a non-zero status into [`Trap::Exit`].
//!
//! Slots are never released, so a host that keeps registering callbacks on a
//! long-lived runtime keeps growing the table.
//!
//! The signature is not checked against the import when the callback is
//! registered; a mismatch traps when the guest actually calls the import.

use super::{CallContext, FuncType, Function, Trap};
use std::fmt;
use tracing::trace;

/// Host callback: reads its arguments from the frame, writes its result into
/// slot 0, and returns 0 on success or a non-zero status to trap.
pub type HostFunc = Box<dyn Fn(&mut CallContext<'_>) -> i32 + Send + Sync>;

/// Identifier of one registered host callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(pub u32);

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// A registered host callback
pub struct Trampoline {
    pub module: String,
    pub field: String,
    pub func_type: FuncType,
    callback: HostFunc,
}

impl fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trampoline")
            .field("module", &self.module)
            .field("field", &self.field)
            .field("signature", &self.func_type.signature())
            .finish()
    }
}

/// Slot table of host callbacks, indexed by slot number
#[derive(Debug, Default)]
pub struct TrampolineRegistry {
    entries: Vec<Trampoline>,
}

impl TrampolineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a callback and return its slot
    pub fn insert(&mut self, module: &str, field: &str, func_type: FuncType, callback: HostFunc) -> Slot {
        let slot = Slot(self.entries.len() as u32);
        self.entries.push(Trampoline {
            module: module.to_string(),
            field: field.to_string(),
            func_type,
            callback,
        });
        slot
    }

    pub fn get(&self, slot: Slot) -> Option<&Trampoline> {
        self.entries.get(slot.0 as usize)
    }

    /// Number of slots handed out so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The single native entry point for guest-to-host calls
    ///
    /// `import` is the import stub being called; its declared type must match
    /// the signature the callback was registered with.
    pub fn dispatch(&self, slot: Slot, import: &Function, ctx: &mut CallContext<'_>) -> Result<(), Trap> {
        let trampoline = self.get(slot).ok_or_else(|| Trap::UnresolvedImport {
            module: import.import_module().unwrap_or_default().to_string(),
            field: import.import_field().unwrap_or_default().to_string(),
        })?;

        if trampoline.func_type != *import.func_type() {
            return Err(Trap::SignatureMismatch {
                module: trampoline.module.clone(),
                field: trampoline.field.clone(),
                expected: import.func_type().signature(),
                actual: trampoline.func_type.signature(),
            });
        }

        trace!(%slot, module = %trampoline.module, field = %trampoline.field, "dispatching host call");
        match (trampoline.callback)(ctx) {
            0 => Ok(()),
            status => Err(Trap::Exit(status)),
        }
    }
}
