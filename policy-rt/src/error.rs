use std::path::PathBuf;
use thiserror::Error;

/// Failures resolving a `use`/`require` specifier to a module.
#[derive(Debug, Error, Clone)]
pub enum ModuleResolveError {
    #[error("unsupported vendor `{vendor}` in library path (only the host app and `local` are resolvable)")]
    UnsupportedVendor { vendor: String },

    #[error("bare specifier `{0}` cannot be resolved without a leading `.`, `/`, or `@vendor/`")]
    BareSpecifier(String),

    #[error("no script file found for `{spec}` (tried {tried:?})")]
    FileNotFound { spec: String, tried: Vec<PathBuf> },

    #[error("unknown built-in module group `{group}` for app `{app}`")]
    UnknownBuiltinGroup { app: String, group: String },

    #[error("failed to read module source at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::sync::Arc<std::io::Error>,
    },

    #[error("`use` statement gave neither a library path nor a string source")]
    NoModuleSpecifier,
}

/// Failures surfaced from the embedded script VM while compiling or running
/// a module factory.
#[derive(Debug, Error, Clone)]
pub enum RuntimeError {
    #[error("script compilation failed for {path}: {message}")]
    Compile { path: PathBuf, message: String },

    #[error("script evaluation raised an error for {path}: {message}")]
    Evaluation { path: PathBuf, message: String },

    #[error("module factory for {path} did not evaluate to a callable value")]
    FactoryNotCallable { path: PathBuf },

    #[error("execution was cancelled")]
    Cancelled,

    #[error("built-in `{module}.{function}` expected {expected} argument(s), got {actual}")]
    Arity {
        module: &'static str,
        function: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("built-in `{module}.{function}` argument {index} has the wrong type: {detail}")]
    ArgumentType {
        module: &'static str,
        function: &'static str,
        index: usize,
        detail: String,
    },

    #[error("{module}.{function}: {detail}")]
    BuiltinFailure {
        module: &'static str,
        function: &'static str,
        detail: String,
    },

    #[error(transparent)]
    ModuleResolve(#[from] ModuleResolveError),
}
