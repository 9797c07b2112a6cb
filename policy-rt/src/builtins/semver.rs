use super::{arity_error, builtin_failure};
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};
use semver::{Version, VersionReq};

const MODULE: &str = "semver";

fn string_arg(function: &'static str, args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped())
}

fn parse_version(function: &'static str, s: &str) -> JsResult<Version> {
    Version::parse(s).map_err(|e| builtin_failure(MODULE, function, e.to_string()))
}

fn compare(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let a = parse_version("compare", &string_arg("compare", args, 0, context)?)?;
    let b = parse_version("compare", &string_arg("compare", args, 1, context)?)?;
    let ordering = match a.cmp(&b) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    };
    Ok(JsValue::from(ordering))
}

fn satisfies(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let version = parse_version("satisfies", &string_arg("satisfies", args, 0, context)?)?;
    let req_str = string_arg("satisfies", args, 1, context)?;
    let req = VersionReq::parse(&req_str).map_err(|e| builtin_failure(MODULE, "satisfies", e.to_string()))?;
    Ok(JsValue::from(req.matches(&version)))
}

fn major(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let v = parse_version("major", &string_arg("major", args, 0, context)?)?;
    Ok(JsValue::from(v.major as f64))
}

fn minor(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let v = parse_version("minor", &string_arg("minor", args, 0, context)?)?;
    Ok(JsValue::from(v.minor as f64))
}

fn patch(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let v = parse_version("patch", &string_arg("patch", args, 0, context)?)?;
    Ok(JsValue::from(v.patch as f64))
}

fn is_valid(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let s = string_arg("isValid", args, 0, context)?;
    Ok(JsValue::from(Version::parse(&s).is_ok()))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(compare), js_string!("compare"), 2)
        .function(NativeFunction::from_fn_ptr(satisfies), js_string!("satisfies"), 2)
        .function(NativeFunction::from_fn_ptr(major), js_string!("major"), 1)
        .function(NativeFunction::from_fn_ptr(minor), js_string!("minor"), 1)
        .function(NativeFunction::from_fn_ptr(patch), js_string!("patch"), 1)
        .function(NativeFunction::from_fn_ptr(is_valid), js_string!("isValid"), 1)
        .build()
}
