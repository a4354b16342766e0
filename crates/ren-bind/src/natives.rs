use log::debug;
use ren_abi::RenContextHandle;
use ren_engine::Engine;
use ren_values::{Function, Value};

use crate::BindError;

/// A native collected at link time, usually submitted by `#[native]`.
///
/// `register` owns one trampoline, so each definition can be registered
/// once per process.
pub struct NativeDefinition {
    pub name: &'static str,
    pub register: fn(&Engine) -> Result<Function, BindError>,
}

inventory::collect!(NativeDefinition);

pub fn native_definitions() -> Vec<&'static NativeDefinition> {
    inventory::iter::<NativeDefinition>().collect()
}

/// Register every collected native with `engine` and bind it by name in
/// `context`. Returns the bound names.
pub fn bind_natives(engine: &Engine, context: RenContextHandle) -> Result<Vec<&'static str>, BindError> {
    let mut bound = Vec::new();
    for def in inventory::iter::<NativeDefinition>() {
        let function = (def.register)(engine)?;
        engine
            .set_word(context, def.name, Value::Function(function))
            .map_err(|_| BindError::InvalidContext(context))?;
        bound.push(def.name);
    }
    debug!("bound {} natives into engine {}", bound.len(), engine.handle().0);
    Ok(bound)
}
