//! Common test utilities shared between integration tests

#![allow(dead_code)]

use kasm_embed::runtime::{CallContext, Config, Runtime, Trap};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Captured writer that stores output for testing
pub struct CapturedWriter(pub Arc<Mutex<Vec<u8>>>);

impl Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn runtime() -> Runtime {
    Runtime::new(Config::default()).expect("Failed to create runtime")
}

/// Guest code for `i(ii)` addition
pub fn add(ctx: &mut CallContext<'_>) -> Result<(), Trap> {
    let a = ctx.arg_i32(0)?;
    let b = ctx.arg_i32(1)?;
    ctx.set_return_i32(a.wrapping_add(b))
}

/// Host `print(ptr, len)`: copies guest bytes into `out`, returns non-zero on
/// a bad range
pub fn print_to(out: Arc<Mutex<Vec<u8>>>) -> impl Fn(&mut CallContext<'_>) -> i32 + Send + Sync + 'static {
    move |ctx: &mut CallContext<'_>| {
        let (Ok(ptr), Ok(len)) = (ctx.arg_i32(0), ctx.arg_i32(1)) else {
            return 1;
        };
        let mut writer = CapturedWriter(out.clone());
        match ctx.memory().slice(ptr as u32, len as usize) {
            Ok(bytes) => match writer.write_all(bytes) {
                Ok(()) => 0,
                Err(_) => 2,
            },
            Err(_) => 3,
        }
    }
}
