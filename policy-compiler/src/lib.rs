//! Lexer, Pratt parser, AST, and semantic indexer for the policy DSL.
//!
//! Two entry points: [`parse`] turns source text into a
//! [`ast::Program`] plus accumulated diagnostics, and [`index`] turns a
//! `Program` into a [`resolve::Namespace`] plus its own diagnostics.

pub mod ast;
pub mod constraints;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod tokens;

use diagnostics::Diagnostic;
use std::sync::Arc;

pub fn parse(source: &str, file: impl Into<Arc<str>>) -> (ast::Program, Vec<Diagnostic>) {
    let (program, errors) = parser::parse(source, file);
    let diagnostics = errors
        .into_iter()
        .map(|e| Diagnostic::error("ParseError", e.message, e.range))
        .collect();
    (program, diagnostics)
}

pub fn index(program: &ast::Program) -> (resolve::Namespace, Vec<Diagnostic>) {
    let (namespace, errors) = resolve::index(program);
    let diagnostics = errors
        .into_iter()
        .map(|e| {
            let kind = index_error_kind(&e);
            let range = index_error_range(&e, &program.range);
            Diagnostic::error(kind, e.to_string(), range)
        })
        .collect();
    (namespace, diagnostics)
}

fn index_error_kind(e: &resolve::IndexError) -> &'static str {
    match e {
        resolve::IndexError::Conflict { .. } => "Conflict",
        resolve::IndexError::NotFound { .. } => "NotFound",
        resolve::IndexError::InvalidInvocation(_) => "InvalidInvocation",
        resolve::IndexError::OrderingViolation { .. } => "OrderingViolation",
    }
}

fn index_error_range(e: &resolve::IndexError, fallback: &policy_core::Range) -> policy_core::Range {
    match e {
        resolve::IndexError::Conflict { second, .. } => second.clone(),
        resolve::IndexError::NotFound { range, .. } => range.clone(),
        resolve::IndexError::OrderingViolation { range, .. } => range.clone(),
        resolve::IndexError::InvalidInvocation(_) => fallback.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_index_minimal_program() {
        let (program, parse_diags) = parse(
            "namespace com/example\npolicy p1 {\n  rule ok = { yield age >= 18 }\n  export decision of ok\n}",
            "p.pl",
        );
        assert!(parse_diags.is_empty(), "{parse_diags:?}");
        let (namespace, index_diags) = index(&program);
        assert!(index_diags.is_empty(), "{index_diags:?}");
        assert_eq!(namespace.fqn.to_string(), "com/example");
        assert!(namespace.policies.contains_key("p1"));
    }

    #[test]
    fn empty_policy_produces_invalid_invocation_diagnostic() {
        let (program, _) = parse("namespace x\npolicy p {}", "p.pl");
        let (_, diags) = index(&program);
        assert!(diags.iter().any(|d| d.kind == "InvalidInvocation"));
    }
}
