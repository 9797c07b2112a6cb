//! Host-native built-in module groups.
//!
//! Each group is a factory `(vm) → exports_object`, installed into a VM's
//! [`boa_engine::Context`] the first time a `use`/`require` resolves to it.
//! Every exported function validates its own arity and argument types and
//! raises a JS-level `TypeError` on mismatch.

pub mod collection;
pub mod encoding;
pub mod hash;
pub mod json;
pub mod jwt;
pub mod math;
pub mod net;
pub mod regex;
pub mod semver;
pub mod string;
pub mod time;
pub mod uuid;

use crate::error::RuntimeError;
use boa_engine::{Context, JsError, JsNativeError, JsObject};
use std::collections::HashMap;
use std::sync::Arc;

pub type NativeFactory = Arc<dyn Fn(&mut Context) -> JsObject + Send + Sync>;

/// The fixed dispatch table, keyed by the group name that appears after the
/// app vendor segment (`@<app>/<group>`).
pub fn factory_table() -> HashMap<String, NativeFactory> {
    let mut table: HashMap<String, NativeFactory> = HashMap::new();
    table.insert("math".into(), Arc::new(math::install));
    table.insert("string".into(), Arc::new(string::install));
    table.insert("hash".into(), Arc::new(hash::install));
    table.insert("encoding".into(), Arc::new(encoding::install));
    table.insert("jwt".into(), Arc::new(jwt::install));
    table.insert("net".into(), Arc::new(net::install));
    table.insert("uuid".into(), Arc::new(uuid::install));
    table.insert("time".into(), Arc::new(time::install));
    table.insert("semver".into(), Arc::new(semver::install));
    table.insert("regex".into(), Arc::new(regex::install));
    table.insert("json".into(), Arc::new(json::install));
    table.insert("collection".into(), Arc::new(collection::install));
    table
}

pub(crate) fn type_error(message: impl Into<String>) -> JsError {
    JsNativeError::typ().with_message(message.into()).into()
}

/// Builds the canonical [`RuntimeError::Arity`] and immediately flattens it
/// to the `JsError` a `NativeFunction` must return, so the message a script
/// author sees and the message `Vm`/host code would log from a `RuntimeError`
/// are the same string.
pub(crate) fn arity_error(module: &'static str, function: &'static str, expected: &'static str, actual: usize) -> JsError {
    type_error(
        RuntimeError::Arity {
            module,
            function,
            expected,
            actual,
        }
        .to_string(),
    )
}

/// For arguments whose coercion succeeds but whose shape is still wrong for
/// the built-in at hand (e.g. `collection.listUnique`'s argument 0 must be
/// an array, not merely any value `to_object` would accept).
pub(crate) fn argument_type_error(module: &'static str, function: &'static str, index: usize, detail: impl Into<String>) -> JsError {
    type_error(
        RuntimeError::ArgumentType {
            module,
            function,
            index,
            detail: detail.into(),
        }
        .to_string(),
    )
}

/// For failures that are about the operation itself rather than a single
/// argument's shape: malformed tokens, unparsable version strings, domain
/// violations like a negative `math.sqrt` input.
pub(crate) fn builtin_failure(module: &'static str, function: &'static str, detail: impl Into<String>) -> JsError {
    type_error(
        RuntimeError::BuiltinFailure {
            module,
            function,
            detail: detail.into(),
        }
        .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_table_covers_every_builtin_group() {
        let table = factory_table();
        for group in [
            "math",
            "string",
            "hash",
            "encoding",
            "jwt",
            "net",
            "uuid",
            "time",
            "semver",
            "regex",
            "json",
            "collection",
        ] {
            assert!(table.contains_key(group), "missing builtin group {group}");
        }
    }
}
