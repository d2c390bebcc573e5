//! The module and function directory
//!
//! After instantiation the engine exposes every module as an ordered table of
//! functions plus a table of the functions it imports. Imported functions sit
//! at the front of the function table, followed by the defined functions, and
//! are named after the field they import.

use super::{CallContext, CompiledCode, FuncType, RuntimeError, Slot, Trap};
use std::fmt;
use std::sync::Arc;

/// Position of a module in its runtime's module list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub usize);

/// Handle to a function: its owning module and its index in that module's
/// function table
///
/// Resolving a name walks the module list, so callers that invoke the same
/// function repeatedly should keep the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncRef {
    pub module: ModuleId,
    pub index: u32,
}

/// Where an imported function comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportDescriptor {
    pub module: String,
    pub field: String,
}

pub(crate) enum FunctionBody {
    /// Executable code produced by the engine
    Compiled(Arc<dyn CompiledCode>),
    /// Import stub, bound to a trampoline slot once the host registers one
    Import {
        descriptor: ImportDescriptor,
        binding: Option<Slot>,
    },
}

/// A function in a module's function table
pub struct Function {
    name: Option<String>,
    func_type: FuncType,
    pub(crate) body: FunctionBody,
}

impl Function {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn func_type(&self) -> &FuncType {
        &self.func_type
    }

    /// Canonical signature string, e.g. `i(ii)`
    pub fn signature(&self) -> String {
        self.func_type.signature()
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.body, FunctionBody::Compiled(_))
    }

    pub fn import(&self) -> Option<&ImportDescriptor> {
        match &self.body {
            FunctionBody::Import { descriptor, .. } => Some(descriptor),
            FunctionBody::Compiled(_) => None,
        }
    }

    /// Source module of an imported function
    pub fn import_module(&self) -> Option<&str> {
        self.import().map(|d| d.module.as_str())
    }

    /// Source field of an imported function
    pub fn import_field(&self) -> Option<&str> {
        self.import().map(|d| d.field.as_str())
    }

    /// The trampoline slot an import is bound to
    pub fn binding(&self) -> Option<Slot> {
        match &self.body {
            FunctionBody::Import { binding, .. } => *binding,
            FunctionBody::Compiled(_) => None,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("signature", &self.func_type.signature())
            .field("import", &self.import())
            .field("binding", &self.binding())
            .finish()
    }
}

/// A module's function directory
#[derive(Debug)]
pub struct Module {
    name: Option<String>,
    functions: Vec<Function>,
    /// Function table indices of the imports, in declaration order. `None`
    /// when the module declares no imports.
    imports: Option<Vec<u32>>,
    memory: Option<(u32, Option<u32>)>,
}

impl Module {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    pub fn num_imports(&self) -> usize {
        self.imports.as_ref().map_or(0, Vec::len)
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, index: u32) -> Option<&Function> {
        self.functions.get(index as usize)
    }

    /// Function table index of the import at `index`
    pub fn import_index(&self, index: u32) -> Option<u32> {
        self.imports.as_ref()?.get(index as usize).copied()
    }

    /// First function in table order with the given name, with its index
    pub fn function_by_name(&self, name: &str) -> Option<(u32, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .find(|(_, f)| f.name() == Some(name))
            .map(|(i, f)| (i as u32, f))
    }

    /// Declared memory limits as (initial pages, maximum pages)
    pub fn memory_limits(&self) -> Option<(u32, Option<u32>)> {
        self.memory
    }

    pub(crate) fn function_mut(&mut self, index: u32) -> Option<&mut Function> {
        self.functions.get_mut(index as usize)
    }

    pub(crate) fn import_indices(&self) -> &[u32] {
        self.imports.as_deref().unwrap_or_default()
    }
}

/// Builds the directory of an instantiated module
///
/// Signature strings are parsed as they are added; the first parse failure is
/// reported by [`build`](ModuleBuilder::build).
#[derive(Default)]
pub struct ModuleBuilder {
    name: Option<String>,
    imports: Vec<Function>,
    defined: Vec<Function>,
    memory: Option<(u32, Option<u32>)>,
    error: Option<RuntimeError>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A named module
    pub fn named(name: impl Into<String>) -> Self {
        ModuleBuilder {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Declare an imported function
    pub fn import(mut self, module: impl Into<String>, field: impl Into<String>, signature: &str) -> Self {
        if let Some(func_type) = self.parse(signature) {
            let field = field.into();
            self.imports.push(Function {
                name: Some(field.clone()),
                func_type,
                body: FunctionBody::Import {
                    descriptor: ImportDescriptor {
                        module: module.into(),
                        field,
                    },
                    binding: None,
                },
            });
        }
        self
    }

    /// Define a function whose code is a Rust closure
    pub fn function<F>(self, name: impl Into<String>, signature: &str, code: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), Trap> + Send + Sync + 'static,
    {
        self.function_code(Some(name.into()), signature, Arc::new(code))
    }

    /// Define a function without a name
    pub fn anonymous_function<F>(self, signature: &str, code: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), Trap> + Send + Sync + 'static,
    {
        self.function_code(None, signature, Arc::new(code))
    }

    /// Define a function from engine-compiled code
    pub fn function_code(mut self, name: Option<String>, signature: &str, code: Arc<dyn CompiledCode>) -> Self {
        if let Some(func_type) = self.parse(signature) {
            self.defined.push(Function {
                name,
                func_type,
                body: FunctionBody::Compiled(code),
            });
        }
        self
    }

    /// Declare linear memory limits in pages
    pub fn memory(mut self, initial: u32, max: Option<u32>) -> Self {
        self.memory = Some((initial, max));
        self
    }

    pub fn build(self) -> Result<Module, RuntimeError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let imports = if self.imports.is_empty() {
            None
        } else {
            Some((0..self.imports.len() as u32).collect())
        };
        let mut functions = self.imports;
        functions.extend(self.defined);
        Ok(Module {
            name: self.name,
            functions,
            imports,
            memory: self.memory,
        })
    }

    fn parse(&mut self, signature: &str) -> Option<FuncType> {
        match FuncType::parse(signature) {
            Ok(func_type) => Some(func_type),
            Err(err) => {
                self.error.get_or_insert(err);
                None
            }
        }
    }
}
