//! The embedding core of a WebAssembly runtime.
//!
//! kasm-embed sits between a host application and a WebAssembly execution
//! engine. The engine parses, compiles and runs guest code; this crate gives
//! the host a typed view of what the engine instantiated and a calling
//! convention into and out of it:
//!
//! - resolving functions by module/function name or by table index,
//!   including the table of imported functions
//! - calling guest functions, marshalling arguments and results through the
//!   engine's slot stack and reporting traps
//! - registering host callbacks that guest imports reach through a single
//!   trampoline entry point keyed by slot
//! - direct access to the guest's linear memory
//!
//! # Example
//!
//! Load a module whose `add` is compiled to a Rust closure, call it, and let
//! guest code reach the host through an import:
//!
//! ```
//! use kasm_embed::runtime::{CallContext, Config, ModuleBuilder, Runtime};
//!
//! let mut rt = Runtime::new(Config::default()).unwrap();
//!
//! let module = ModuleBuilder::named("mathlib")
//!     .import("env", "double", "i(i)")
//!     .function("add", "i(ii)", |ctx: &mut CallContext<'_>| {
//!         let sum = ctx.arg_i32(0)?.wrapping_add(ctx.arg_i32(1)?);
//!         ctx.set_return_i32(sum)
//!     })
//!     .function("add_doubled", "i(ii)", |ctx: &mut CallContext<'_>| {
//!         let sum = ctx.arg_i32(0)?.wrapping_add(ctx.arg_i32(1)?);
//!         ctx.set_return_i32(sum)?;
//!         ctx.call_import(0, 0)
//!     })
//!     .build()
//!     .unwrap();
//! let id = rt.load_module(module).unwrap();
//!
//! rt.register(id, "env", "double", "i(i)", |ctx: &mut CallContext<'_>| {
//!     let v = ctx.arg_i32(0).unwrap_or_default();
//!     match ctx.set_return_i32(v * 2) {
//!         Ok(()) => 0,
//!         Err(_) => 1,
//!     }
//! })
//! .unwrap();
//!
//! let add = rt.find_function("mathlib", "add").unwrap();
//! assert_eq!(rt.call(add, &[3, 4]).unwrap(), 7);
//! assert_eq!(rt.call_by_name("mathlib", "add_doubled", &[3, 4]).unwrap(), 14);
//! ```
//!
//! # Modules
//!
//! - [`runtime`] -- Runtime store, module directory, resolver, call invoker,
//!   trampoline registry and linear memory.

pub mod runtime;
