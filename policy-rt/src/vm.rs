//! The per-alias virtual machine.
//!
//! Each `use` binding gets its own [`Vm`]: a `boa_engine::Context` plus an
//! export cache and a cancellation hook. A `Vm` is not `Send` (neither is
//! `boa_engine::Context`) and must never be shared across threads; callers
//! that need one VM per alias per evaluation already get that for free by
//! constructing a fresh `Vm` per alias.

use crate::builtins;
use crate::cancellation::CancellationToken;
use crate::error::RuntimeError;
use crate::registry::{ModuleKey, ModuleRef, ModuleSpec, Registry};
use boa_engine::{js_string, Context, JsObject, JsValue, NativeFunction};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{instrument, trace};

/// A required module's exports, handed back to the DSL side of a `use`
/// binding.
#[derive(Debug, Clone)]
pub struct ExportsHandle(pub JsValue);

struct SharedState {
    registry: Arc<Registry>,
    export_cache: HashMap<ModuleKey, JsValue>,
    cancellation: CancellationToken,
}

pub struct Vm {
    context: Context,
    shared: Rc<RefCell<SharedState>>,
}

impl Vm {
    pub fn new(registry: Arc<Registry>, cancellation: CancellationToken) -> Self {
        Self {
            context: Context::default(),
            shared: Rc::new(RefCell::new(SharedState {
                registry,
                export_cache: HashMap::new(),
                cancellation,
            })),
        }
    }

    /// Resolves and evaluates `module_ref`, returning its exports.
    #[instrument(skip(self), fields(key = ?module_ref.key))]
    pub fn require(&mut self, module_ref: &ModuleRef) -> Result<ExportsHandle, RuntimeError> {
        require_by_key(&mut self.context, &self.shared, module_ref.key.clone()).map(ExportsHandle)
    }
}

fn require_by_key(context: &mut Context, shared: &Rc<RefCell<SharedState>>, key: ModuleKey) -> Result<JsValue, RuntimeError> {
    if shared.borrow().cancellation.is_cancelled() {
        return Err(RuntimeError::Cancelled);
    }
    if let Some(existing) = shared.borrow().export_cache.get(&key) {
        trace!(?key, "export cache hit");
        return Ok(existing.clone());
    }

    let registry = Arc::clone(&shared.borrow().registry);
    let spec = registry
        .spec_for(&key)
        .expect("a ModuleRef is only ever constructed for a key the registry already holds a spec for");

    if let Some(factory) = spec.native_factory() {
        let exports = JsValue::from(factory(context));
        shared.borrow_mut().export_cache.insert(key, exports.clone());
        return Ok(exports);
    }

    run_script_module(context, shared, &key, &spec)
}

/// Installs a placeholder exports object before running the factory so a
/// cycle `A requires B requires A` observes A's pre-factory exports, then
/// replaces it with the final value once the factory returns.
fn run_script_module(
    context: &mut Context,
    shared: &Rc<RefCell<SharedState>>,
    key: &ModuleKey,
    spec: &Arc<ModuleSpec>,
) -> Result<JsValue, RuntimeError> {
    let path = spec.path.clone().expect("script module specs always carry a path");
    let dir = spec.dir.clone().unwrap_or_else(|| PathBuf::from("."));

    let placeholder = JsValue::from(JsObject::with_object_proto(context.intrinsics()));
    shared.borrow_mut().export_cache.insert(key.clone(), placeholder);

    let result = (|| -> Result<JsValue, RuntimeError> {
        let script = spec
            .compiled_program(context)
            .map_err(|message| RuntimeError::Compile { path: path.clone(), message })?;
        let factory_value = script
            .evaluate(context)
            .map_err(|e| RuntimeError::Evaluation { path: path.clone(), message: e.to_string() })?;
        let factory_obj = factory_value
            .as_object()
            .cloned()
            .filter(boa_engine::object::JsObject::is_callable)
            .ok_or_else(|| RuntimeError::FactoryNotCallable { path: path.clone() })?;

        let module_obj = JsObject::with_object_proto(context.intrinsics());
        let exports_obj = JsObject::with_object_proto(context.intrinsics());
        module_obj
            .set(js_string!("exports"), JsValue::from(exports_obj.clone()), true, context)
            .map_err(|e| RuntimeError::Evaluation { path: path.clone(), message: e.to_string() })?;

        let bound_require = bind_require(context, Rc::clone(shared), dir.clone());
        with_transient_global_require(context, bound_require.clone(), |context| {
            factory_obj
                .call(
                    &JsValue::undefined(),
                    &[JsValue::from(bound_require), JsValue::from(module_obj.clone()), JsValue::from(exports_obj)],
                    context,
                )
                .map_err(|e| RuntimeError::Evaluation { path: path.clone(), message: e.to_string() })
        })?;

        module_obj
            .get(js_string!("exports"), context)
            .map_err(|e| RuntimeError::Evaluation { path: path.clone(), message: e.to_string() })
    })();

    match result {
        Ok(final_exports) => {
            shared.borrow_mut().export_cache.insert(key.clone(), final_exports.clone());
            Ok(final_exports)
        }
        Err(e) => {
            shared.borrow_mut().export_cache.remove(key);
            Err(e)
        }
    }
}

/// Swaps the context's global `require` for `bound` around `body`,
/// restoring whatever was there before on the way out.
fn with_transient_global_require<T>(
    context: &mut Context,
    bound: JsObject,
    body: impl FnOnce(&mut Context) -> Result<T, RuntimeError>,
) -> Result<T, RuntimeError> {
    let name = js_string!("require");
    let previous = context.global_object().get(name.clone(), context).ok();
    let _ = context.global_object().set(name.clone(), JsValue::from(bound), true, context);

    let result = body(context);

    match previous {
        Some(value) if !value.is_undefined() => {
            let _ = context.global_object().set(name, value, true, context);
        }
        _ => {
            let _ = context.global_object().delete_property_or_throw(name, context);
        }
    }
    result
}

fn bind_require(context: &mut Context, shared: Rc<RefCell<SharedState>>, dir: PathBuf) -> JsObject {
    let closure = move |_this: &JsValue, args: &[JsValue], context: &mut Context| -> boa_engine::JsResult<JsValue> {
        let spec_arg = args.first().cloned().unwrap_or_else(JsValue::undefined);
        let spec_str = spec_arg.to_string(context)?.to_std_string_escaped();
        resolve_and_require(context, &shared, &spec_str, &dir).map_err(|e| builtins::type_error(e.to_string()))
    };
    unsafe { NativeFunction::from_closure(closure) }
        .to_js_function(context.realm())
        .into()
}

fn resolve_and_require(context: &mut Context, shared: &Rc<RefCell<SharedState>>, spec: &str, dir: &Path) -> Result<JsValue, RuntimeError> {
    let registry = Arc::clone(&shared.borrow().registry);
    let module_ref = registry.resolve_require(spec, dir)?;
    require_by_key(context, shared, module_ref.key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_vm_has_empty_export_cache() {
        let registry = Arc::new(Registry::new("app", "/pack"));
        let vm = Vm::new(registry, CancellationToken::new());
        assert!(vm.shared.borrow().export_cache.is_empty());
    }
}
