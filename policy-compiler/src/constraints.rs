//! Per-`TypeRef`-kind constraint whitelist.

use thiserror::Error;

/// `-1` denotes variadic, requiring at least one argument.
const VARIADIC: i32 = -1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeConstraintError {
    #[error("unknown constraint '{name}' for type '{type_key}'")]
    UnknownName { type_key: String, name: String },
    #[error("constraint '{name}' expects {expected} argument(s), got {actual}")]
    BadArity {
        name: String,
        expected: i32,
        actual: usize,
    },
}

struct Entry {
    name: &'static str,
    arity: i32,
}

const fn e(name: &'static str, arity: i32) -> Entry {
    Entry { name, arity }
}

const STRING: &[Entry] = &[
    e("minlength", 1),
    e("maxlength", 1),
    e("length", 1),
    e("regexp", 1),
    e("starts_with", 1),
    e("ends_with", 1),
    e("has_substring", 1),
    e("not_has_substring", 1),
    e("email", 0),
    e("url", 0),
    e("uuid", 0),
    e("alphanumeric", 0),
    e("alpha", 0),
    e("numeric", 0),
    e("lowercase", 0),
    e("uppercase", 0),
    e("trimmed", 0),
    e("not_empty", 0),
    e("one_of", VARIADIC),
];

const NUMBER: &[Entry] = &[
    e("min", 1),
    e("max", 1),
    e("range", 2),
    e("multiple_of", 1),
    e("positive", 0),
    e("negative", 0),
    e("non_negative", 0),
    e("non_positive", 0),
    e("finite", 0),
    e("infinite", 0),
    e("nan", 0),
];

const LIST: &[Entry] = &[
    e("minlength", 1),
    e("maxlength", 1),
    e("length", 1),
    e("not_empty", 0),
];

const MAP: &[Entry] = &[
    e("minlength", 1),
    e("maxlength", 1),
    e("length", 1),
    e("keys", 1),
    e("schema", 1),
];

const BOOLEAN: &[Entry] = &[];

const SHAPE: &[Entry] = &[e("required", 0), e("optional", 0)];

fn table(type_key: &str) -> Option<&'static [Entry]> {
    match type_key {
        "string" => Some(STRING),
        "number" => Some(NUMBER),
        "list" => Some(LIST),
        "map" => Some(MAP),
        "boolean" => Some(BOOLEAN),
        "shape" => Some(SHAPE),
        _ => None,
    }
}

/// Validates a constraint name and argument count against the whitelist for
/// `type_key` (one of `string`/`number`/`list`/`map`/`boolean`/`shape`, see
/// [`crate::ast::constraint_whitelist_key`]).
pub fn validate(type_key: &str, name: &str, arg_count: usize) -> Result<(), TypeConstraintError> {
    let entries = table(type_key).unwrap_or(&[]);
    let entry = entries
        .iter()
        .find(|e| e.name == name)
        .ok_or_else(|| TypeConstraintError::UnknownName {
            type_key: type_key.to_string(),
            name: name.to_string(),
        })?;
    let ok = if entry.arity == VARIADIC {
        arg_count >= 1
    } else {
        arg_count as i32 == entry.arity
    };
    if ok {
        Ok(())
    } else {
        Err(TypeConstraintError::BadArity {
            name: name.to_string(),
            expected: entry.arity,
            actual: arg_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_maxlength_requires_one_arg() {
        assert!(validate("string", "maxlength", 1).is_ok());
        assert!(validate("string", "maxlength", 0).is_err());
    }

    #[test]
    fn string_one_of_is_variadic_needs_at_least_one() {
        assert!(validate("string", "one_of", 0).is_err());
        assert!(validate("string", "one_of", 1).is_ok());
        assert!(validate("string", "one_of", 5).is_ok());
    }

    #[test]
    fn number_range_requires_two_args() {
        assert!(validate("number", "range", 2).is_ok());
        assert!(validate("number", "range", 1).is_err());
    }

    #[test]
    fn boolean_has_no_constraints() {
        assert!(validate("boolean", "anything", 0).is_err());
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            validate("string", "bogus", 0),
            Err(TypeConstraintError::UnknownName {
                type_key: "string".into(),
                name: "bogus".into(),
            })
        );
    }
}
