//! Function resolution
//!
//! Functions are located by numeric index within a module's function table,
//! by index within its import table, or by (module name, function name).
//! Name lookups return the first match: the earliest module in load order
//! whose name matches, then the earliest function in table order. Modules
//! without a name and functions without a name never match.
//!
//! The name index is filled as modules are loaded and keeps the first entry
//! for every key, which gives the same answer as walking the module list.

use super::{FuncRef, Function, Module, ModuleId, Runtime, RuntimeError};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct NameIndex {
    /// module name -> function name -> first match
    qualified: HashMap<String, HashMap<String, FuncRef>>,
    unqualified: HashMap<String, FuncRef>,
}

impl NameIndex {
    pub(crate) fn insert_module(&mut self, id: ModuleId, module: &Module) {
        for (index, function) in module.functions().iter().enumerate() {
            let Some(name) = function.name() else {
                continue;
            };
            let func = FuncRef {
                module: id,
                index: index as u32,
            };
            self.unqualified.entry(name.to_string()).or_insert(func);
            if let Some(module_name) = module.name() {
                self.qualified
                    .entry(module_name.to_string())
                    .or_default()
                    .entry(name.to_string())
                    .or_insert(func);
            }
        }
    }

    fn get(&self, module_name: &str, function_name: &str) -> Option<FuncRef> {
        self.qualified.get(module_name)?.get(function_name).copied()
    }

    fn get_unqualified(&self, function_name: &str) -> Option<FuncRef> {
        self.unqualified.get(function_name).copied()
    }
}

impl Runtime {
    /// Function at `index` in `module`'s function table
    pub fn resolve_by_index(&self, module: ModuleId, index: u32) -> Result<FuncRef, RuntimeError> {
        let func = FuncRef { module, index };
        self.function(func)?;
        Ok(func)
    }

    /// Import number `index` of `module`
    ///
    /// Imports are optional, so a missing module, a module without an import
    /// table, or an index past its end all give `None`.
    pub fn resolve_import_by_index(&self, module: Option<ModuleId>, index: u32) -> Option<FuncRef> {
        let id = module?;
        let func_index = self.modules.get(id.0)?.import_index(index)?;
        Some(FuncRef {
            module: id,
            index: func_index,
        })
    }

    /// First function named `function_name` in the first module named `module_name`
    pub fn find_function(&self, module_name: &str, function_name: &str) -> Result<FuncRef, RuntimeError> {
        self.names
            .get(module_name, function_name)
            .ok_or_else(|| RuntimeError::NotFound {
                module: module_name.to_string(),
                function: function_name.to_string(),
            })
    }

    /// First function named `function_name` in any module, in load order
    pub fn find_function_by_name(&self, function_name: &str) -> Result<FuncRef, RuntimeError> {
        self.names
            .get_unqualified(function_name)
            .ok_or_else(|| RuntimeError::FunctionNotFound(function_name.to_string()))
    }

    /// Imports of `module` with no trampoline bound yet
    pub fn unresolved_imports(&self, module: ModuleId) -> Result<Vec<FuncRef>, RuntimeError> {
        let m = self.module(module)?;
        Ok(m.import_indices()
            .iter()
            .filter(|index| m.function(**index).is_some_and(|f| f.binding().is_none()))
            .map(|index| FuncRef { module, index: *index })
            .collect())
    }

    /// The module a function belongs to
    pub fn module_of(&self, func: FuncRef) -> Result<&Module, RuntimeError> {
        self.module(func.module)
    }

    /// Resolve and borrow in one step
    pub fn lookup(&self, module_name: &str, function_name: &str) -> Result<(FuncRef, &Function), RuntimeError> {
        let func = self.find_function(module_name, function_name)?;
        Ok((func, self.function(func)?))
    }
}
