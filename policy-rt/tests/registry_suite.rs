use policy_rt::cancellation::CancellationToken;
use policy_rt::registry::Registry;
use policy_rt::vm::Vm;
use std::sync::Arc;

fn registry() -> Arc<Registry> {
    Arc::new(Registry::new("myapp", "/pack"))
}

#[test]
fn use_with_lib_parts_resolves_to_a_native_module() {
    let registry = registry();
    let module_ref = registry
        .prepare_use(None, Some(&["myapp".to_string(), "math".to_string()]), std::path::Path::new("/pack/policies"))
        .expect("native lib path should resolve");
    let mut vm = Vm::new(Arc::clone(&registry), CancellationToken::new());
    let exports = vm.require(&module_ref).expect("native module should always require cleanly");
    assert!(!exports.0.is_undefined());
}

#[test]
fn use_with_unknown_vendor_is_rejected() {
    let registry = registry();
    let result = registry.prepare_use(
        None,
        Some(&["someone-else".to_string(), "thing".to_string()]),
        std::path::Path::new("/pack/policies"),
    );
    assert!(result.is_err());
}

#[test]
fn repeated_require_of_the_same_native_module_hits_the_export_cache() {
    let registry = registry();
    let module_ref = registry
        .prepare_use(None, Some(&["myapp".to_string(), "uuid".to_string()]), std::path::Path::new("/pack/policies"))
        .unwrap();
    let mut vm = Vm::new(Arc::clone(&registry), CancellationToken::new());
    let first = vm.require(&module_ref).unwrap();
    let second = vm.require(&module_ref).unwrap();
    assert!(first.0.strict_equals(&second.0));
}

#[test]
fn a_cancelled_token_blocks_further_requires() {
    let registry = registry();
    let module_ref = registry
        .prepare_use(None, Some(&["myapp".to_string(), "math".to_string()]), std::path::Path::new("/pack/policies"))
        .unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let mut vm = Vm::new(Arc::clone(&registry), token);
    assert!(vm.require(&module_ref).is_err());
}
