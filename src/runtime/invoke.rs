//! Call invocation
//!
//! [`Runtime::call`] is the 32-bit integer call convention: each argument is
//! written as a 32-bit word into consecutive slots from slot 0, the function
//! runs on the shared stack, and slot 0 is read back as an i32. Functions
//! whose signature mentions anything other than i32 are refused up front
//! rather than having their values truncated; use [`Runtime::call_values`]
//! for those.
//!
//! A trap leaves the stack partially written. Its slots carry no meaning
//! until the next call overwrites them.

use super::{FuncRef, Runtime, RuntimeError, Value, ValueKind};
use tracing::trace;

impl Runtime {
    /// Call a function taking and returning only i32 values
    ///
    /// Functions with no result return 0.
    ///
    /// # Errors
    /// - `UnsupportedSignature` if any argument or the result is not i32
    /// - `ArgumentCountMismatch` if `args` does not match the declared arity
    /// - `ExecutionTrap` if the engine traps; the trap is also kept as
    ///   [`last_error`](Runtime::last_error)
    pub fn call(&mut self, func: FuncRef, args: &[i32]) -> Result<i32, RuntimeError> {
        let func_type = self.function(func)?.func_type();
        if !func_type.is_i32_only() {
            return Err(RuntimeError::UnsupportedSignature(func_type.signature()));
        }
        if args.len() != func_type.num_args() {
            return Err(RuntimeError::ArgumentCountMismatch {
                expected: func_type.num_args(),
                actual: args.len(),
            });
        }
        let returns = func_type.return_type();

        trace!(module = func.module.0, index = func.index, ?args, "call");
        self.stack_mut().write_i32_args(args)?;
        self.execute(func)?;

        Ok(match returns {
            ValueKind::None => 0,
            _ => self.stack().read_i32_return(),
        })
    }

    /// Call a function with typed arguments, returning its typed result
    ///
    /// # Errors
    /// - `ArgumentCountMismatch` if `args` does not match the declared arity
    /// - `TypeMismatch` if an argument's kind differs from the declared one
    /// - `ExecutionTrap` if the engine traps
    pub fn call_values(&mut self, func: FuncRef, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
        let func_type = self.function(func)?.func_type();
        if args.len() != func_type.num_args() {
            return Err(RuntimeError::ArgumentCountMismatch {
                expected: func_type.num_args(),
                actual: args.len(),
            });
        }
        for (i, (arg, expected)) in args.iter().zip(func_type.params()).enumerate() {
            if arg.kind() != *expected {
                return Err(RuntimeError::TypeMismatch {
                    expected: format!("{expected} for argument {i}"),
                    actual: arg.kind().to_string(),
                });
            }
        }
        let returns = func_type.return_type();

        trace!(module = func.module.0, index = func.index, ?args, "call");
        self.stack_mut().write_args(args)?;
        self.execute(func)?;

        Ok(self.stack().read_return(returns))
    }

    /// Look up `module_name.function_name` and call it with i32 arguments
    pub fn call_by_name(&mut self, module_name: &str, function_name: &str, args: &[i32]) -> Result<i32, RuntimeError> {
        let func = self.find_function(module_name, function_name)?;
        self.call(func, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::test_utils::test::{adder, runtime};
    use crate::runtime::{CallContext, ModuleBuilder, Trap};
    use rstest::rstest;

    #[rstest]
    #[case(3, 4, 7)]
    #[case(-5, 2, -3)]
    #[case(i32::MAX, 1, i32::MIN)]
    fn test_call_add(#[case] a: i32, #[case] b: i32, #[case] expected: i32) {
        let mut rt = runtime();
        rt.load_module(adder("mathlib")).unwrap();
        let add = rt.find_function("mathlib", "add").unwrap();
        assert_eq!(rt.call(add, &[a, b]).unwrap(), expected);
    }

    #[test]
    fn test_call_wrong_arity_rejected() {
        let mut rt = runtime();
        rt.load_module(adder("mathlib")).unwrap();
        let add = rt.find_function("mathlib", "add").unwrap();

        assert!(matches!(
            rt.call(add, &[3]),
            Err(RuntimeError::ArgumentCountMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            rt.call(add, &[1, 2, 3]),
            Err(RuntimeError::ArgumentCountMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_call_rejects_wide_signatures() {
        let mut rt = runtime();
        let id = rt
            .load_module(
                ModuleBuilder::named("wide")
                    .function("i64", "I(i)", |_: &mut CallContext<'_>| Ok(()))
                    .function("f32", "i(f)", |_: &mut CallContext<'_>| Ok(()))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        for index in 0..2 {
            let func = rt.resolve_by_index(id, index).unwrap();
            assert!(matches!(rt.call(func, &[1]), Err(RuntimeError::UnsupportedSignature(_))));
        }
        // Nothing was written
        assert_eq!(rt.stack().slots()[0], 0);
    }

    #[test]
    fn test_void_function_returns_zero() {
        let mut rt = runtime();
        rt.load_module(
            ModuleBuilder::named("m")
                .function("touch", "v()", |ctx: &mut CallContext<'_>| ctx.set_return_i32(99))
                .build()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(rt.call_by_name("m", "touch", &[]).unwrap(), 0);
    }

    #[test]
    fn test_trap_recorded_as_last_error() {
        let mut rt = runtime();
        rt.load_module(
            ModuleBuilder::named("m")
                .function("boom", "i()", |_: &mut CallContext<'_>| Err(Trap::Unreachable))
                .build()
                .unwrap(),
        )
        .unwrap();

        let err = rt.call_by_name("m", "boom", &[]).unwrap_err();
        assert_eq!(err.trap(), Some(&Trap::Unreachable));
        assert_eq!(rt.last_error(), Some(&Trap::Unreachable));

        // A successful call does not clear it
        rt.load_module(adder("mathlib")).unwrap();
        assert_eq!(rt.call_by_name("mathlib", "add", &[1, 1]).unwrap(), 2);
        assert_eq!(rt.take_last_error(), Some(Trap::Unreachable));
        assert_eq!(rt.last_error(), None);
    }

    #[test]
    fn test_call_values() {
        let mut rt = runtime();
        rt.load_module(
            ModuleBuilder::named("m")
                .function("mul", "F(Ff)", |ctx: &mut CallContext<'_>| {
                    let a = ctx.arg_f64(0)?;
                    let b = ctx.arg_f32(1)? as f64;
                    ctx.set_return(Value::F64(a * b))
                })
                .function("widen", "I(i)", |ctx: &mut CallContext<'_>| {
                    let v = ctx.arg_i32(0)? as i64;
                    ctx.set_return(Value::I64(v << 32))
                })
                .build()
                .unwrap(),
        )
        .unwrap();

        let mul = rt.find_function("m", "mul").unwrap();
        assert_eq!(
            rt.call_values(mul, &[Value::F64(1.5), Value::F32(4.0)]).unwrap(),
            Some(Value::F64(6.0))
        );

        let widen = rt.find_function("m", "widen").unwrap();
        assert_eq!(
            rt.call_values(widen, &[Value::I32(3)]).unwrap(),
            Some(Value::I64(3 << 32))
        );
    }

    #[test]
    fn test_call_values_type_checked() {
        let mut rt = runtime();
        rt.load_module(adder("mathlib")).unwrap();
        let add = rt.find_function("mathlib", "add").unwrap();

        match rt.call_values(add, &[Value::I32(1), Value::I64(2)]) {
            Err(RuntimeError::TypeMismatch { expected, actual }) => {
                assert_eq!(expected, "i32 for argument 1");
                assert_eq!(actual, "i64");
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
        assert_eq!(
            rt.call_values(add, &[Value::I32(1), Value::I32(2)]).unwrap(),
            Some(Value::I32(3))
        );
    }
}
