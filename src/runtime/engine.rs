//! The execution contract between the runtime and the engine
//!
//! Compiled code is anything implementing [`CompiledCode`]: it is handed a
//! [`CallContext`] whose frame holds its arguments from slot 0 and receives
//! its return value in slot 0. The context also carries the runtime's linear
//! memory and the module directory, so compiled code can grow memory and call
//! other functions, including imports that re-enter the host through the
//! trampoline registry.
//!
//! Nested calls take a frame further up the same slot stack and bump the
//! [`StackGuard`] depth; running out of either traps with
//! [`Trap::StackOverflow`].

use super::module::FunctionBody;
use super::{FuncRef, Memory, Module, ModuleId, TrampolineRegistry, Trap, Value, ValueKind};

/// Executable code for one function
pub trait CompiledCode: Send + Sync {
    fn execute(&self, ctx: &mut CallContext<'_>) -> Result<(), Trap>;
}

impl<F> CompiledCode for F
where
    F: Fn(&mut CallContext<'_>) -> Result<(), Trap> + Send + Sync,
{
    fn execute(&self, ctx: &mut CallContext<'_>) -> Result<(), Trap> {
        self(ctx)
    }
}

/// Call depth limit, initialised fresh for every top-level call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackGuard {
    depth: usize,
    limit: usize,
}

impl StackGuard {
    pub fn new(limit: usize) -> Self {
        StackGuard { depth: 0, limit }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn enter(self) -> Result<Self, Trap> {
        if self.depth + 1 >= self.limit {
            return Err(Trap::StackOverflow);
        }
        Ok(StackGuard {
            depth: self.depth + 1,
            ..self
        })
    }
}

/// Everything a running function can reach
pub struct CallContext<'a> {
    modules: &'a [Module],
    trampolines: &'a TrampolineRegistry,
    frame: &'a mut [u64],
    memory: &'a mut Memory,
    module: ModuleId,
    guard: StackGuard,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        modules: &'a [Module],
        trampolines: &'a TrampolineRegistry,
        frame: &'a mut [u64],
        memory: &'a mut Memory,
        module: ModuleId,
        guard: StackGuard,
    ) -> Self {
        CallContext {
            modules,
            trampolines,
            frame,
            memory,
            module,
            guard,
        }
    }

    /// Module of the function currently executing
    pub fn module_id(&self) -> ModuleId {
        self.module
    }

    pub fn guard(&self) -> StackGuard {
        self.guard
    }

    /// This call's frame: slot 0 onwards, up to the end of the stack
    pub fn frame(&self) -> &[u64] {
        &*self.frame
    }

    pub fn frame_mut(&mut self) -> &mut [u64] {
        &mut *self.frame
    }

    /// Raw slot `index` of this frame
    pub fn slot(&self, index: usize) -> Result<u64, Trap> {
        self.frame.get(index).copied().ok_or(Trap::StackOverflow)
    }

    pub fn set_slot(&mut self, index: usize, raw: u64) -> Result<(), Trap> {
        let slot = self.frame.get_mut(index).ok_or(Trap::StackOverflow)?;
        *slot = raw;
        Ok(())
    }

    /// Argument `index` decoded as `kind`
    pub fn arg(&self, index: usize, kind: ValueKind) -> Result<Option<Value>, Trap> {
        Ok(Value::from_slot(kind, self.slot(index)?))
    }

    pub fn arg_i32(&self, index: usize) -> Result<i32, Trap> {
        Ok(self.slot(index)? as u32 as i32)
    }

    pub fn arg_i64(&self, index: usize) -> Result<i64, Trap> {
        Ok(self.slot(index)? as i64)
    }

    pub fn arg_f32(&self, index: usize) -> Result<f32, Trap> {
        Ok(f32::from_bits(self.slot(index)? as u32))
    }

    pub fn arg_f64(&self, index: usize) -> Result<f64, Trap> {
        Ok(f64::from_bits(self.slot(index)?))
    }

    /// Write the return value into slot 0
    pub fn set_return(&mut self, value: Value) -> Result<(), Trap> {
        self.set_slot(0, value.to_slot())
    }

    pub fn set_return_i32(&mut self, value: i32) -> Result<(), Trap> {
        self.set_return(Value::I32(value))
    }

    pub fn memory(&self) -> &Memory {
        &*self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut *self.memory
    }

    /// `memory.grow`: previous size in pages, or -1
    pub fn memory_grow(&mut self, delta_pages: u32) -> i32 {
        self.memory.grow(delta_pages)
    }

    /// Call `func` with its frame starting at `frame_offset` of this frame
    ///
    /// Arguments must already be in place; the result is left in the callee's
    /// slot 0 (`frame_offset` of this frame).
    pub fn call(&mut self, func: FuncRef, frame_offset: usize) -> Result<(), Trap> {
        let mut callee = self.enter(func.module, frame_offset)?;
        execute(&mut callee, func)
    }

    /// Call the current module's import number `index`
    pub fn call_import(&mut self, index: u32, frame_offset: usize) -> Result<(), Trap> {
        let func_index = self
            .modules
            .get(self.module.0)
            .and_then(|m| m.import_index(index))
            .ok_or(Trap::UndefinedImport(index))?;
        self.call(
            FuncRef {
                module: self.module,
                index: func_index,
            },
            frame_offset,
        )
    }

    /// Write `args` at `frame_offset`, call `func`, and decode its result
    pub fn call_values(&mut self, func: FuncRef, frame_offset: usize, args: &[Value]) -> Result<Option<Value>, Trap> {
        let result = lookup(self.modules, func)?.func_type().return_type();
        let frame = self.frame.get_mut(frame_offset..).ok_or(Trap::StackOverflow)?;
        if frame.len() < args.len() {
            return Err(Trap::StackOverflow);
        }
        for (slot, arg) in frame.iter_mut().zip(args) {
            *slot = arg.to_slot();
        }
        self.call(func, frame_offset)?;
        Ok(Value::from_slot(result, self.slot(frame_offset)?))
    }

    fn enter(&mut self, module: ModuleId, frame_offset: usize) -> Result<CallContext<'_>, Trap> {
        let guard = self.guard.enter()?;
        let frame = self.frame.get_mut(frame_offset..).ok_or(Trap::StackOverflow)?;
        Ok(CallContext {
            modules: self.modules,
            trampolines: self.trampolines,
            frame,
            memory: &mut *self.memory,
            module,
            guard,
        })
    }
}

fn lookup(modules: &[Module], func: FuncRef) -> Result<&super::Function, Trap> {
    modules
        .get(func.module.0)
        .and_then(|m| m.function(func.index))
        .ok_or(Trap::UndefinedFunction {
            module: func.module.0,
            index: func.index,
        })
}

/// Run `func` in `ctx`
///
/// This is the single execution entry point: compiled functions run their
/// code, bound imports dispatch through their trampoline slot, and unbound
/// imports trap.
pub fn execute(ctx: &mut CallContext<'_>, func: FuncRef) -> Result<(), Trap> {
    let modules = ctx.modules;
    let function = lookup(modules, func)?;

    // Return values land in slot 0 even for nullary functions
    if ctx.frame.len() < function.func_type().num_args().max(1) {
        return Err(Trap::StackOverflow);
    }

    match &function.body {
        FunctionBody::Compiled(code) => code.execute(ctx),
        FunctionBody::Import {
            binding: Some(slot), ..
        } => {
            let trampolines = ctx.trampolines;
            trampolines.dispatch(*slot, function, ctx)
        }
        FunctionBody::Import {
            descriptor,
            binding: None,
        } => Err(Trap::UnresolvedImport {
            module: descriptor.module.clone(),
            field: descriptor.field.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_guard() {
        let guard = StackGuard::new(3);
        assert_eq!(guard.depth(), 0);
        let guard = guard.enter().unwrap();
        let guard = guard.enter().unwrap();
        assert_eq!(guard.depth(), 2);
        assert_eq!(guard.enter(), Err(Trap::StackOverflow));
    }

    #[test]
    fn test_frame_access() {
        let modules: Vec<Module> = Vec::new();
        let trampolines = TrampolineRegistry::new();
        let mut memory = Memory::default();
        let mut slots = [7u64, 0xffff_ffff, 0];
        let mut ctx = CallContext::new(
            &modules,
            &trampolines,
            &mut slots,
            &mut memory,
            ModuleId(0),
            StackGuard::new(10),
        );

        assert_eq!(ctx.arg_i32(0).unwrap(), 7);
        assert_eq!(ctx.arg_i32(1).unwrap(), -1);
        assert_eq!(ctx.arg_i64(1).unwrap(), 0xffff_ffff);
        assert_eq!(ctx.arg(0, ValueKind::None).unwrap(), None);
        assert_eq!(ctx.slot(3), Err(Trap::StackOverflow));

        ctx.set_return(Value::F32(1.5)).unwrap();
        assert_eq!(ctx.arg_f32(0).unwrap(), 1.5);
        assert_eq!(ctx.set_slot(5, 1), Err(Trap::StackOverflow));
    }

    #[test]
    fn test_undefined_function() {
        let modules: Vec<Module> = Vec::new();
        let trampolines = TrampolineRegistry::new();
        let mut memory = Memory::default();
        let mut slots = [0u64; 4];
        let mut ctx = CallContext::new(
            &modules,
            &trampolines,
            &mut slots,
            &mut memory,
            ModuleId(0),
            StackGuard::new(10),
        );

        let func = FuncRef {
            module: ModuleId(3),
            index: 1,
        };
        assert_eq!(
            execute(&mut ctx, func),
            Err(Trap::UndefinedFunction { module: 3, index: 1 })
        );
        assert_eq!(ctx.call_import(0, 1), Err(Trap::UndefinedImport(0)));
    }
}
