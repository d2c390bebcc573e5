//! The runtime store - owns modules, the call stack, linear memory and the
//! trampoline registry
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Runtime                          │
//! │  modules (insertion order)                               │
//! │   [0] "env"     [imports..., defined...]                 │
//! │   [1] "mathlib" [add, sub, ...]                          │
//! │  name index     ("mathlib", "add") -> FuncRef(1, 0)      │
//! │  stack          [u64; stack_size / 8], shared by calls   │
//! │  memory         linear memory, one per runtime           │
//! │  trampolines    slot -> host callback                    │
//! │  last_error     trap recorded by the last failed call    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation that runs guest code or hands out memory views takes
//! `&mut self` or `&self`, so one call at a time owns the stack. Share a
//! runtime across threads through [`SharedRuntime`](super::SharedRuntime).

use super::engine::StackGuard;
use super::module::FunctionBody;
use super::resolve::NameIndex;
use super::{
    CallContext, Config, FuncRef, FuncType, Function, Memory, Module, ModuleId, RuntimeError, Slot, Stack,
    TrampolineRegistry, Trap,
};
use tracing::{debug, warn};

pub struct Runtime {
    config: Config,
    pub(crate) modules: Vec<Module>,
    pub(crate) names: NameIndex,
    stack: Stack,
    memory: Memory,
    trampolines: TrampolineRegistry,
    last_error: Option<Trap>,
}

impl Runtime {
    pub fn new(config: Config) -> Result<Self, RuntimeError> {
        config.validate()?;
        let stack = Stack::new(config.stack_size)?;
        let memory = Memory::new(0, config.max_memory_pages)?;
        Ok(Runtime {
            config,
            modules: Vec::new(),
            names: NameIndex::default(),
            stack,
            memory,
            trampolines: TrampolineRegistry::new(),
            last_error: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Link an instantiated module's directory into this runtime
    ///
    /// # Errors
    /// - `DuplicateModule` if a module with the same name is already loaded
    /// - `StackTooSmall` if a function takes more arguments than the stack holds
    /// - `MemoryError` if the declared memory limits cannot be met
    pub fn load_module(&mut self, module: Module) -> Result<ModuleId, RuntimeError> {
        if let Some(name) = module.name() {
            if self.modules.iter().any(|m| m.name() == Some(name)) {
                return Err(RuntimeError::DuplicateModule(name.to_string()));
            }
        }

        let capacity = self.stack.capacity();
        if let Some(widest) = module.functions().iter().map(|f| f.func_type().num_args()).max() {
            if widest > capacity {
                return Err(RuntimeError::StackTooSmall {
                    required: widest,
                    capacity,
                });
            }
        }

        if let Some((initial, max)) = module.memory_limits() {
            self.memory.apply_limits(initial, max)?;
        }

        let id = ModuleId(self.modules.len());
        self.names.insert_module(id, &module);
        debug!(
            module = module.name().unwrap_or("<anonymous>"),
            id = id.0,
            functions = module.num_functions(),
            imports = module.num_imports(),
            "loaded module"
        );
        self.modules.push(module);
        Ok(id)
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, id: ModuleId) -> Result<&Module, RuntimeError> {
        self.modules.get(id.0).ok_or(RuntimeError::UnknownModule(id.0))
    }

    /// The function a handle refers to
    pub fn function(&self, func: FuncRef) -> Result<&Function, RuntimeError> {
        self.module(func.module)?
            .function(func.index)
            .ok_or(RuntimeError::IndexOutOfRange(func.index))
    }

    /// Register a host callback and bind it to `module`'s matching imports
    ///
    /// The callback gets the next slot whether or not an import matched. Only
    /// the signature string's syntax is checked here; a signature that differs
    /// from the import's declared type traps when the guest calls it.
    pub fn register<F>(
        &mut self,
        module: ModuleId,
        host_module: &str,
        host_field: &str,
        signature: &str,
        callback: F,
    ) -> Result<Slot, RuntimeError>
    where
        F: Fn(&mut CallContext<'_>) -> i32 + Send + Sync + 'static,
    {
        let func_type = FuncType::parse(signature)?;
        let target = self.modules.get_mut(module.0).ok_or(RuntimeError::UnknownModule(module.0))?;

        let slot = self.trampolines.insert(host_module, host_field, func_type, Box::new(callback));

        let mut linked = 0;
        for index in target.import_indices().to_vec() {
            if let Some(function) = target.function_mut(index) {
                if let FunctionBody::Import { descriptor, binding } = &mut function.body {
                    if descriptor.module == host_module && descriptor.field == host_field {
                        *binding = Some(slot);
                        linked += 1;
                    }
                }
            }
        }

        debug!(%slot, host_module, host_field, signature, linked, "registered trampoline");
        Ok(slot)
    }

    pub fn trampolines(&self) -> &TrampolineRegistry {
        &self.trampolines
    }

    /// Current byte length of linear memory
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// The live linear memory buffer
    ///
    /// This is a view, not a copy. The borrow ends before the next call,
    /// which may grow and move the buffer, so fetch it again afterwards.
    pub fn memory_data(&self) -> &[u8] {
        self.memory.data()
    }

    pub fn memory_data_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut()
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Raw view of the shared call stack
    ///
    /// After a trapped call the slots are partially written and meaningless.
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub(crate) fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    /// Trap recorded by the most recent failed call
    pub fn last_error(&self) -> Option<&Trap> {
        self.last_error.as_ref()
    }

    pub fn take_last_error(&mut self) -> Option<Trap> {
        self.last_error.take()
    }

    /// Run `func` on the shared stack, whose slots already hold the arguments
    ///
    /// A trap is recorded as the last error and returned.
    pub(crate) fn execute(&mut self, func: FuncRef) -> Result<(), RuntimeError> {
        let Runtime {
            config,
            modules,
            stack,
            memory,
            trampolines,
            last_error,
            ..
        } = self;

        let mut ctx = CallContext::new(
            modules,
            trampolines,
            stack.slots_mut(),
            memory,
            func.module,
            StackGuard::new(config.max_call_depth),
        );

        match super::engine::execute(&mut ctx, func) {
            Ok(()) => Ok(()),
            Err(trap) => {
                warn!(module = func.module.0, index = func.index, %trap, "call trapped");
                *last_error = Some(trap.clone());
                Err(RuntimeError::ExecutionTrap(trap))
            }
        }
    }
}
