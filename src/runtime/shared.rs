//! Serialised access to a runtime from several threads
//!
//! A runtime has one call stack, so only one call may run at a time. The
//! lock is held for the whole of each call, registration or memory access;
//! nested calls made from inside guest or host code go through the
//! [`CallContext`](super::CallContext) and never touch the lock.

use super::{CallContext, FuncRef, ModuleId, Runtime, RuntimeError, Slot};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub struct SharedRuntime {
    inner: Arc<Mutex<Runtime>>,
}

impl SharedRuntime {
    pub fn new(runtime: Runtime) -> Self {
        SharedRuntime {
            inner: Arc::new(Mutex::new(runtime)),
        }
    }

    /// Exclusive access for the duration of the guard
    ///
    /// A panic while the lock was held does not leave the runtime in a state
    /// the next caller cannot use, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, Runtime> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut Runtime) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn call(&self, func: FuncRef, args: &[i32]) -> Result<i32, RuntimeError> {
        self.lock().call(func, args)
    }

    pub fn find_function(&self, module_name: &str, function_name: &str) -> Result<FuncRef, RuntimeError> {
        self.lock().find_function(module_name, function_name)
    }

    pub fn register<F>(
        &self,
        module: ModuleId,
        host_module: &str,
        host_field: &str,
        signature: &str,
        callback: F,
    ) -> Result<Slot, RuntimeError>
    where
        F: Fn(&mut CallContext<'_>) -> i32 + Send + Sync + 'static,
    {
        self.lock().register(module, host_module, host_field, signature, callback)
    }

    /// Copy `len` bytes of linear memory at `addr`
    pub fn read_memory(&self, addr: u32, len: usize) -> Result<Vec<u8>, RuntimeError> {
        Ok(self.lock().memory().read_bytes(addr, len)?)
    }
}
