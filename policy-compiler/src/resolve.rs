//! The indexer: turns a parsed [`Program`] into a [`Namespace`], the
//! semantic model downstream stages query against.
//!
//! Unlike the parser, the indexer never bails out of a policy on the first
//! problem — every statement is still folded into the semantic model on a
//! best-effort basis so one pass surfaces as many diagnostics as possible,
//! mirroring the parser's own "continue until EOF" failure semantics.

use crate::ast::{self, FactStmt, Program, RuleStmt, ShapeBody, Statement, TypeRef, TypeRefKind, UseStmt, VarDeclStmt};
use crate::constraints;
use policy_core::{Fqn, Range};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("duplicate {kind} (first defined at {first}, redefined at {second})")]
    Conflict { kind: String, first: Range, second: Range },
    #[error("undefined {kind} referenced at {range}")]
    NotFound { kind: String, range: Range },
    #[error("{0}")]
    InvalidInvocation(String),
    #[error("{kind} out of order at {range}")]
    OrderingViolation { kind: String, range: Range },
}

#[derive(Debug, Clone)]
pub struct RuleExportRecord {
    pub attachments: Vec<String>,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct ShapeRecord {
    pub defining_policy: Option<String>,
    pub name: String,
    pub body: ShapeBody,
    pub range: Range,
}

#[derive(Debug, Clone)]
pub struct Policy {
    pub namespace_ref: Fqn,
    pub fqn: Fqn,
    pub range: Range,
    pub lets: HashMap<String, VarDeclStmt>,
    pub facts: HashMap<String, FactStmt>,
    pub rules: HashMap<String, RuleStmt>,
    pub rule_exports: HashMap<String, RuleExportRecord>,
    pub uses: HashMap<String, UseStmt>,
    pub shapes: HashMap<String, ShapeRecord>,
}

#[derive(Debug, Clone)]
pub struct Namespace {
    pub fqn: Fqn,
    pub policies: HashMap<String, Policy>,
    pub shapes: HashMap<String, ShapeRecord>,
    pub shape_exports: HashSet<String>,
}

pub fn index(program: &Program) -> (Namespace, Vec<IndexError>) {
    let mut errors = Vec::new();
    let fqn = program
        .statements
        .iter()
        .find_map(|s| match s {
            Statement::Namespace(n) => Some(n.fqn.clone()),
            _ => None,
        })
        .unwrap_or_else(|| Fqn::new(Vec::new()));

    let mut namespace = Namespace {
        fqn: fqn.clone(),
        policies: HashMap::new(),
        shapes: HashMap::new(),
        shape_exports: HashSet::new(),
    };

    for stmt in &program.statements {
        match stmt {
            Statement::Policy(p) => {
                let (policy, mut policy_errors) = index_policy(&fqn, p);
                errors.append(&mut policy_errors);
                for (name, shape) in &policy.shapes {
                    if let Some(existing) = namespace.shapes.get(name) {
                        errors.push(IndexError::Conflict {
                            kind: "shape".into(),
                            first: existing.range.clone(),
                            second: shape.range.clone(),
                        });
                    } else {
                        namespace.shapes.insert(name.clone(), shape.clone());
                    }
                }
                if let Some(existing) = namespace.policies.get(&p.name) {
                    errors.push(IndexError::Conflict {
                        kind: "policy".into(),
                        first: existing.range.clone(),
                        second: p.range.clone(),
                    });
                } else {
                    namespace.policies.insert(p.name.clone(), policy);
                }
            }
            Statement::Shape(s) => {
                if let Some(existing) = namespace.shapes.get(&s.name) {
                    errors.push(IndexError::Conflict {
                        kind: "shape".into(),
                        first: existing.range.clone(),
                        second: s.range.clone(),
                    });
                } else {
                    validate_shape_body(&s.body, &mut errors);
                    namespace.shapes.insert(
                        s.name.clone(),
                        ShapeRecord {
                            defining_policy: None,
                            name: s.name.clone(),
                            body: s.body.clone(),
                            range: s.range.clone(),
                        },
                    );
                }
            }
            Statement::ShapeExport(e) => {
                if namespace.shapes.contains_key(&e.name) {
                    namespace.shape_exports.insert(e.name.clone());
                } else {
                    errors.push(IndexError::NotFound {
                        kind: "shape".into(),
                        range: e.range.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    (namespace, errors)
}

fn child_fqn(namespace_fqn: &Fqn, segment: &str) -> Fqn {
    let mut parts = namespace_fqn.parts().to_vec();
    parts.push(segment.to_string());
    Fqn::new(parts)
}

fn validate_type_ref(type_ref: &TypeRef, errors: &mut Vec<IndexError>) {
    let key = ast::constraint_whitelist_key(&type_ref.kind);
    for c in &type_ref.constraints {
        if let Err(e) = constraints::validate(key, &c.name, c.args.len()) {
            errors.push(IndexError::InvalidInvocation(format!("{e} at {}", c.range)));
        }
    }
    match &type_ref.kind {
        TypeRefKind::List(elem) | TypeRefKind::Map(elem) => validate_type_ref(elem, errors),
        TypeRefKind::Record(fields) => fields.iter().for_each(|f| validate_type_ref(f, errors)),
        TypeRefKind::String
        | TypeRefKind::Int
        | TypeRefKind::Float
        | TypeRefKind::Number
        | TypeRefKind::Boolean
        | TypeRefKind::Document
        | TypeRefKind::Shape(_) => {}
    }
}

fn validate_shape_body(body: &ShapeBody, errors: &mut Vec<IndexError>) {
    match body {
        ShapeBody::Simple(t) => validate_type_ref(t, errors),
        ShapeBody::Complex { fields, .. } => {
            for (_, field) in fields {
                validate_type_ref(&field.type_ref, errors);
            }
        }
    }
}

/// Statement ordering phases within a policy body: facts, then uses, then
/// everything else. Shapes and comments don't participate.
#[derive(PartialEq, PartialOrd)]
enum Phase {
    Facts,
    Uses,
    Body,
}

fn check_unique(name: &str, range: &Range, errors: &mut Vec<IndexError>, seen: &mut HashMap<String, Range>) {
    if let Some(existing) = seen.get(name) {
        errors.push(IndexError::Conflict {
            kind: "identifier".into(),
            first: existing.clone(),
            second: range.clone(),
        });
    } else {
        seen.insert(name.to_string(), range.clone());
    }
}

fn index_policy(namespace_fqn: &Fqn, p: &ast::PolicyStmt) -> (Policy, Vec<IndexError>) {
    let mut errors = Vec::new();
    let mut seen_identifiers: HashMap<String, Range> = HashMap::new();
    let mut lets = HashMap::new();
    let mut facts = HashMap::new();
    let mut rules = HashMap::new();
    let mut rule_exports: HashMap<String, RuleExportRecord> = HashMap::new();
    let mut uses = HashMap::new();
    let mut shapes = HashMap::new();
    let mut phase = Phase::Facts;

    for stmt in &p.body {
        match stmt {
            Statement::Comment(_) => {}
            Statement::Shape(s) => {
                if let Some(existing) = shapes.get(&s.name).map(|r: &ShapeRecord| r.range.clone()) {
                    errors.push(IndexError::Conflict {
                        kind: "shape".into(),
                        first: existing,
                        second: s.range.clone(),
                    });
                } else {
                    validate_shape_body(&s.body, &mut errors);
                    shapes.insert(
                        s.name.clone(),
                        ShapeRecord {
                            defining_policy: Some(p.name.clone()),
                            name: s.name.clone(),
                            body: s.body.clone(),
                            range: s.range.clone(),
                        },
                    );
                }
            }
            Statement::Fact(f) => {
                if phase > Phase::Facts {
                    errors.push(IndexError::OrderingViolation {
                        kind: "fact".into(),
                        range: f.range.clone(),
                    });
                }
                check_unique(&f.alias, &f.range, &mut errors, &mut seen_identifiers);
                if !f.optional && f.default.is_some() {
                    errors.push(IndexError::InvalidInvocation(format!(
                        "required fact '{}' may not declare a default (at {})",
                        f.name, f.range
                    )));
                }
                validate_type_ref(&f.type_ref, &mut errors);
                facts.insert(f.alias.clone(), f.clone());
            }
            Statement::Use(u) => {
                if phase > Phase::Uses {
                    errors.push(IndexError::OrderingViolation {
                        kind: "use".into(),
                        range: u.range.clone(),
                    });
                }
                phase = Phase::Uses;
                check_unique(&u.alias, &u.range, &mut errors, &mut seen_identifiers);
                uses.insert(u.alias.clone(), u.clone());
            }
            Statement::VarDecl(v) => {
                phase = Phase::Body;
                check_unique(&v.name, &v.range, &mut errors, &mut seen_identifiers);
                if let Some(t) = &v.type_ref {
                    validate_type_ref(t, &mut errors);
                }
                lets.insert(v.name.clone(), v.clone());
            }
            Statement::Rule(r) => {
                phase = Phase::Body;
                check_unique(&r.name, &r.range, &mut errors, &mut seen_identifiers);
                rules.insert(r.name.clone(), r.clone());
            }
            Statement::RuleExport(e) => {
                if !rules.contains_key(&e.of) {
                    errors.push(IndexError::NotFound {
                        kind: "rule".into(),
                        range: e.range.clone(),
                    });
                    continue;
                }
                if let Some(existing) = rule_exports.get(&e.of) {
                    errors.push(IndexError::Conflict {
                        kind: "rule export".into(),
                        first: existing.range.clone(),
                        second: e.range.clone(),
                    });
                    continue;
                }
                let mut seen_attach: HashMap<String, Range> = HashMap::new();
                let mut attachments = Vec::new();
                for a in &e.attachments {
                    if let Some(att) = a.as_attachment() {
                        if let Some(prev) = seen_attach.get(&att.what) {
                            errors.push(IndexError::Conflict {
                                kind: "attachment".into(),
                                first: prev.clone(),
                                second: att.range.clone(),
                            });
                        } else {
                            seen_attach.insert(att.what.clone(), att.range.clone());
                            attachments.push(att.what.clone());
                        }
                    }
                }
                rule_exports.insert(
                    e.of.clone(),
                    RuleExportRecord {
                        attachments,
                        range: e.range.clone(),
                    },
                );
            }
            // Cannot occur inside a policy body by construction of `parse_policy`.
            Statement::Namespace(_) | Statement::Policy(_) | Statement::ShapeExport(_) => {}
        }
    }

    if rule_exports.is_empty() {
        errors.push(IndexError::InvalidInvocation(format!(
            "policy '{}' exports nothing (at {})",
            p.name, p.range
        )));
    }

    (
        Policy {
            namespace_ref: namespace_fqn.clone(),
            fqn: child_fqn(namespace_fqn, &p.name),
            range: p.range.clone(),
            lets,
            facts,
            rules,
            rule_exports,
            uses,
            shapes,
        },
        errors,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn index_src(src: &str) -> (Namespace, Vec<IndexError>) {
        let (program, parse_errors) = parse(src, "t.pl");
        assert!(parse_errors.is_empty(), "unexpected parse errors: {parse_errors:?}");
        index(&program)
    }

    #[test]
    fn minimal_policy_with_export_indexes_cleanly() {
        let (namespace, errors) = index_src(
            "namespace demo\npolicy p {\n  rule ok = { yield true }\n  export decision of ok\n}",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(namespace.fqn.to_string(), "demo");
        let policy = namespace.policies.get("p").unwrap();
        assert!(policy.rule_exports.contains_key("ok"));
    }

    #[test]
    fn policy_with_no_exports_is_an_error() {
        let (_, errors) = index_src("namespace demo\npolicy p {\n  rule ok = { yield true }\n}");
        assert!(errors
            .iter()
            .any(|e| matches!(e, IndexError::InvalidInvocation(msg) if msg.contains("exports nothing"))));
    }

    #[test]
    fn fact_after_use_is_an_ordering_violation() {
        let (_, errors) = index_src(
            "namespace demo\npolicy p {\n  use { helper } from \"./h.ts\"\n  fact late: string\n  rule ok = { yield true }\n  export decision of ok\n}",
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, IndexError::OrderingViolation { kind, .. } if kind == "fact")));
    }

    #[test]
    fn duplicate_identifier_across_fact_and_rule_conflicts() {
        let (_, errors) = index_src(
            "namespace demo\npolicy p {\n  fact x: boolean\n  rule x = { yield true }\n  export decision of x\n}",
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, IndexError::Conflict { kind, .. } if kind == "identifier")));
    }

    #[test]
    fn export_of_undefined_rule_is_not_found() {
        let (_, errors) = index_src("namespace demo\npolicy p {\n  export decision of missing\n}");
        assert!(errors
            .iter()
            .any(|e| matches!(e, IndexError::NotFound { kind, .. } if kind == "rule")));
    }

    #[test]
    fn duplicate_attachment_name_within_one_export_conflicts() {
        let (_, errors) = index_src(
            "namespace demo\npolicy p {\n  rule ok = { yield true }\n  export decision of ok attach a as 1 attach a as 2\n}",
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, IndexError::Conflict { kind, .. } if kind == "attachment")));
    }

    #[test]
    fn required_fact_with_default_is_invalid() {
        let (_, errors) = index_src(
            "namespace demo\npolicy p {\n  fact x: boolean default true\n  rule ok = { yield true }\n  export decision of ok\n}",
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, IndexError::InvalidInvocation(msg) if msg.contains("required fact"))));
    }

    #[test]
    fn unknown_constraint_name_is_invalid() {
        let (_, errors) = index_src(
            "namespace demo\npolicy p {\n  fact x: string @bogus\n  rule ok = { yield true }\n  export decision of ok\n}",
        );
        assert!(!errors.is_empty());
    }

    #[test]
    fn shape_export_requires_namespace_level_shape() {
        let (_, errors) = index_src("namespace demo\nexport shape Missing");
        assert!(errors
            .iter()
            .any(|e| matches!(e, IndexError::NotFound { kind, .. } if kind == "shape")));
    }
}
