//! The embedded-script module registry.
//!
//! Resolves `use` bindings and in-script `require(...)` calls to a
//! [`ModuleSpec`], compiling script modules at most once regardless of how
//! many aliases or VMs reference them.

use crate::builtins;
use crate::error::ModuleResolveError;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

/// Identity of a module spec in the registry's map. Two `use`/`require`
/// calls that resolve to the same key share one compiled program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleKey {
    /// `@<app>/<group>` — a host-native built-in group.
    Native { app: String, group: String },
    /// A script module identified by its canonicalized-as-far-as-possible
    /// path. Paths are not required to exist yet at key-construction time
    /// (lazy creation), so this is a lexical join, not `fs::canonicalize`.
    Path(PathBuf),
}

/// A resolved module's identity and lazily-computed compiled form: key,
/// path/dir if it's a script, whether it's a built-in, and the compile-once
/// cell holding its parsed program.
pub struct ModuleSpec {
    pub key: ModuleKey,
    pub path: Option<PathBuf>,
    pub dir: Option<PathBuf>,
    pub is_builtin: bool,
    native_factory: Option<builtins::NativeFactory>,
    compiled: OnceCell<Result<boa_engine::Script, String>>,
}

impl ModuleSpec {
    fn native(key: ModuleKey, factory: builtins::NativeFactory) -> Self {
        Self {
            key,
            path: None,
            dir: None,
            is_builtin: true,
            native_factory: Some(factory),
            compiled: OnceCell::new(),
        }
    }

    fn script(key: ModuleKey, path: PathBuf) -> Self {
        let dir = path.parent().map(Path::to_path_buf);
        Self {
            key,
            path: Some(path),
            dir,
            is_builtin: false,
            native_factory: None,
            compiled: OnceCell::new(),
        }
    }

    pub fn native_factory(&self) -> Option<&builtins::NativeFactory> {
        self.native_factory.as_ref()
    }

    /// Compiles the backing source exactly once via `OnceCell::get_or_init`,
    /// caching either the reusable [`boa_engine::Script`] or the compile
    /// error so every subsequent `require` sees the same outcome.
    pub fn compiled_program(&self, context: &mut boa_engine::Context) -> Result<&boa_engine::Script, String> {
        let result = self.compiled.get_or_init(|| {
            let path = self.path.as_ref().expect("script spec always has a path");
            let source = fs::read_to_string(path).map_err(|e| format!("{path:?}: {e}"))?;
            let wrapped = wrap_as_commonjs_factory(&source);
            trace!(path = %path.display(), "compiling script module");
            boa_engine::Script::parse(boa_engine::Source::from_bytes(wrapped.as_bytes()), None, context)
                .map_err(|e| e.to_string())
        });
        result.as_ref().map_err(Clone::clone)
    }
}

/// Wraps raw script text in the CommonJS factory shape every script module
/// is reduced to before compiling. `.ts` sources are read as-is: this
/// workspace has no TypeScript-to-JavaScript transpiler in its dependency
/// stack, so `.ts` modules must already be valid ECMAScript (see
/// `DESIGN.md`).
fn wrap_as_commonjs_factory(source: &str) -> String {
    format!("(function (require, module, exports) {{\n{source}\n}})")
}

/// A resolved-but-not-yet-required module reference, handed back from
/// [`Registry::prepare_use`] for a `use` statement and from
/// [`Registry::resolve_require`] for an in-script `require(...)` call.
#[derive(Debug, Clone)]
pub struct ModuleRef {
    pub key: ModuleKey,
}

/// Owns the module-spec map. Creation uses double-checked locking so
/// concurrent lookups for the same key produce exactly one spec.
pub struct Registry {
    app_name: String,
    pack_root: PathBuf,
    builtin_groups: HashMap<String, builtins::NativeFactory>,
    specs: RwLock<HashMap<ModuleKey, Arc<ModuleSpec>>>,
}

impl Registry {
    pub fn new(app_name: impl Into<String>, pack_root: impl Into<PathBuf>) -> Self {
        Self {
            app_name: app_name.into(),
            pack_root: pack_root.into(),
            builtin_groups: builtins::factory_table(),
            specs: RwLock::new(HashMap::new()),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn pack_root(&self) -> &Path {
        &self.pack_root
    }

    /// Resolves the two `use` statement forms: a library path (`lib_parts`,
    /// e.g. `["myapp", "net"]` for `@myapp/net`) or a string source resolved
    /// relative to `file_dir`.
    pub fn prepare_use(
        &self,
        local_from: Option<&str>,
        lib_parts: Option<&[String]>,
        file_dir: &Path,
    ) -> Result<ModuleRef, ModuleResolveError> {
        if let Some(parts) = lib_parts {
            return self.resolve_lib_parts(parts);
        }
        if let Some(source) = local_from {
            let path = file_dir.join(source);
            return Ok(ModuleRef {
                key: self.get_or_create_script(path).key.clone(),
            });
        }
        Err(ModuleResolveError::NoModuleSpecifier)
    }

    /// Resolves an in-script `require(spec)` call through its four-way
    /// dispatch: host-native library path, `@local/...` pack-relative path,
    /// filesystem-relative path, or a bare (unsupported) specifier.
    pub fn resolve_require(&self, spec: &str, requiring_dir: &Path) -> Result<ModuleRef, ModuleResolveError> {
        if let Some(rest) = spec.strip_prefix('@') {
            let mut parts = rest.splitn(2, '/');
            let vendor = parts.next().unwrap_or_default();
            let tail = parts.next().unwrap_or_default();
            if vendor == self.app_name {
                return self.resolve_native(tail);
            }
            if vendor == "local" {
                let path = self.resolve_with_extension(&self.pack_root.join(tail), spec)?;
                return Ok(ModuleRef {
                    key: self.get_or_create_script(path).key.clone(),
                });
            }
            return Err(ModuleResolveError::UnsupportedVendor {
                vendor: vendor.to_string(),
            });
        }
        if spec.starts_with('.') || spec.starts_with('/') {
            let path = self.resolve_with_extension(&requiring_dir.join(spec), spec)?;
            return Ok(ModuleRef {
                key: self.get_or_create_script(path).key.clone(),
            });
        }
        Err(ModuleResolveError::BareSpecifier(spec.to_string()))
    }

    fn resolve_lib_parts(&self, parts: &[String]) -> Result<ModuleRef, ModuleResolveError> {
        let (vendor, rest) = parts.split_first().ok_or_else(|| ModuleResolveError::UnsupportedVendor {
            vendor: String::new(),
        })?;
        if vendor == &self.app_name {
            return self.resolve_native(&rest.join("/"));
        }
        if vendor == "local" {
            let path = self.pack_root.join(rest.join("/"));
            return Ok(ModuleRef {
                key: self.get_or_create_script(path).key.clone(),
            });
        }
        Err(ModuleResolveError::UnsupportedVendor { vendor: vendor.clone() })
    }

    fn resolve_native(&self, group: &str) -> Result<ModuleRef, ModuleResolveError> {
        if !self.builtin_groups.contains_key(group) {
            return Err(ModuleResolveError::UnknownBuiltinGroup {
                app: self.app_name.clone(),
                group: group.to_string(),
            });
        }
        let key = ModuleKey::Native {
            app: self.app_name.clone(),
            group: group.to_string(),
        };
        self.get_or_create_native(key.clone(), group);
        Ok(ModuleRef { key })
    }

    fn resolve_with_extension(&self, base: &Path, spec_for_error: &str) -> Result<PathBuf, ModuleResolveError> {
        if base.extension().is_some() {
            return Ok(base.to_path_buf());
        }
        let mut tried = Vec::new();
        for ext in ["ts", "js"] {
            let candidate = base.with_extension(ext);
            if candidate.exists() {
                return Ok(candidate);
            }
            tried.push(candidate);
        }
        // The registry creates specs lazily even for files that don't exist
        // yet at resolution time (the read happens at compile time), but an
        // extensionless bare path with neither suffix present on disk is a
        // definite miss worth reporting eagerly.
        Err(ModuleResolveError::FileNotFound {
            spec: spec_for_error.to_string(),
            tried,
        })
    }

    fn get_or_create_native(&self, key: ModuleKey, group: &str) -> Arc<ModuleSpec> {
        if let Some(existing) = self.specs.read().unwrap().get(&key) {
            return Arc::clone(existing);
        }
        let mut specs = self.specs.write().unwrap();
        if let Some(existing) = specs.get(&key) {
            return Arc::clone(existing);
        }
        let factory = self.builtin_groups.get(group).expect("checked by caller").clone();
        debug!(group, "creating host-native module spec");
        let spec = Arc::new(ModuleSpec::native(key.clone(), factory));
        specs.insert(key, Arc::clone(&spec));
        spec
    }

    fn get_or_create_script(&self, path: PathBuf) -> Arc<ModuleSpec> {
        let key = ModuleKey::Path(path.clone());
        if let Some(existing) = self.specs.read().unwrap().get(&key) {
            return Arc::clone(existing);
        }
        let mut specs = self.specs.write().unwrap();
        if let Some(existing) = specs.get(&key) {
            return Arc::clone(existing);
        }
        debug!(path = %path.display(), "creating script module spec");
        let spec = Arc::new(ModuleSpec::script(key.clone(), path));
        specs.insert(key, Arc::clone(&spec));
        spec
    }

    pub fn spec_for(&self, key: &ModuleKey) -> Option<Arc<ModuleSpec>> {
        self.specs.read().unwrap().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_lib_parts_resolve_to_native_key() {
        let registry = Registry::new("myapp", "/pack");
        let parts = vec!["myapp".to_string(), "net".to_string()];
        let ModuleRef { key } = registry.resolve_lib_parts(&parts).unwrap();
        assert_eq!(
            key,
            ModuleKey::Native {
                app: "myapp".into(),
                group: "net".into()
            }
        );
    }

    #[test]
    fn unknown_vendor_is_an_error() {
        let registry = Registry::new("myapp", "/pack");
        let parts = vec!["other".to_string(), "net".to_string()];
        assert!(matches!(
            registry.resolve_lib_parts(&parts),
            Err(ModuleResolveError::UnsupportedVendor { .. })
        ));
    }

    #[test]
    fn unknown_builtin_group_is_an_error() {
        let registry = Registry::new("myapp", "/pack");
        let parts = vec!["myapp".to_string(), "not-a-group".to_string()];
        assert!(matches!(
            registry.resolve_lib_parts(&parts),
            Err(ModuleResolveError::UnknownBuiltinGroup { .. })
        ));
    }

    #[test]
    fn bare_require_specifier_is_an_error() {
        let registry = Registry::new("myapp", "/pack");
        assert!(matches!(
            registry.resolve_require("lodash", Path::new("/pack/scripts")),
            Err(ModuleResolveError::BareSpecifier(_))
        ));
    }

    #[test]
    fn repeated_native_lookups_share_one_spec() {
        let registry = Registry::new("myapp", "/pack");
        let a = registry.resolve_native("math").unwrap();
        let b = registry.resolve_native("math").unwrap();
        let spec_a = registry.spec_for(&a.key).unwrap();
        let spec_b = registry.spec_for(&b.key).unwrap();
        assert!(Arc::ptr_eq(&spec_a, &spec_b));
    }
}
