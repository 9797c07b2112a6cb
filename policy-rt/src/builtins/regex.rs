use super::{arity_error, builtin_failure};
use boa_engine::object::builtins::JsArray;
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const MODULE: &str = "regex";

/// Process-wide compiled-pattern cache keyed by pattern string, so repeated
/// calls against the same pattern across scripts and VMs never recompile it.
static PATTERN_CACHE: Lazy<Mutex<HashMap<String, Arc<Regex>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn compiled(function: &'static str, pattern: &str) -> JsResult<Arc<Regex>> {
    if let Some(existing) = PATTERN_CACHE.lock().unwrap().get(pattern) {
        return Ok(Arc::clone(existing));
    }
    let compiled = Arc::new(Regex::new(pattern).map_err(|e| builtin_failure(MODULE, function, e.to_string()))?);
    PATTERN_CACHE.lock().unwrap().insert(pattern.to_string(), Arc::clone(&compiled));
    Ok(compiled)
}

fn string_arg(function: &'static str, args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped())
}

fn is_match(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let pattern = string_arg("match", args, 0, context)?;
    let text = string_arg("match", args, 1, context)?;
    Ok(JsValue::from(compiled("match", &pattern)?.is_match(&text)))
}

fn find(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let pattern = string_arg("find", args, 0, context)?;
    let text = string_arg("find", args, 1, context)?;
    match compiled("find", &pattern)?.find(&text) {
        Some(m) => Ok(JsValue::from(js_string!(m.as_str()))),
        None => Ok(JsValue::null()),
    }
}

fn find_all(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let pattern = string_arg("findAll", args, 0, context)?;
    let text = string_arg("findAll", args, 1, context)?;
    let re = compiled("findAll", &pattern)?;
    let matches: Vec<JsValue> = re.find_iter(&text).map(|m| JsValue::from(js_string!(m.as_str()))).collect();
    Ok(JsValue::from(JsArray::from_iter(matches, context)))
}

fn replace(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let pattern = string_arg("replace", args, 0, context)?;
    let text = string_arg("replace", args, 1, context)?;
    let replacement = string_arg("replace", args, 2, context)?;
    let re = compiled("replace", &pattern)?;
    Ok(JsValue::from(js_string!(re.replace(&text, replacement.as_str()).as_ref())))
}

fn replace_all(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let pattern = string_arg("replaceAll", args, 0, context)?;
    let text = string_arg("replaceAll", args, 1, context)?;
    let replacement = string_arg("replaceAll", args, 2, context)?;
    let re = compiled("replaceAll", &pattern)?;
    Ok(JsValue::from(js_string!(re.replace_all(&text, replacement.as_str()).as_ref())))
}

fn split(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let pattern = string_arg("split", args, 0, context)?;
    let text = string_arg("split", args, 1, context)?;
    let re = compiled("split", &pattern)?;
    let parts: Vec<JsValue> = re.split(&text).map(|p| JsValue::from(js_string!(p))).collect();
    Ok(JsValue::from(JsArray::from_iter(parts, context)))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(is_match), js_string!("match"), 2)
        .function(NativeFunction::from_fn_ptr(find), js_string!("find"), 2)
        .function(NativeFunction::from_fn_ptr(find_all), js_string!("findAll"), 2)
        .function(NativeFunction::from_fn_ptr(replace), js_string!("replace"), 3)
        .function(NativeFunction::from_fn_ptr(replace_all), js_string!("replaceAll"), 3)
        .function(NativeFunction::from_fn_ptr(split), js_string!("split"), 2)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_compiles_share_the_cached_pattern() {
        let a = compiled("test", r"\d+").unwrap();
        let b = compiled("test", r"\d+").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
