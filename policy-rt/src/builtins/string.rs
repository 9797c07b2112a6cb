use super::arity_error;
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};

const MODULE: &str = "string";

fn string_arg(function: &'static str, args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped())
}

fn upper(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(string_arg("upper", args, 0, context)?.to_uppercase().as_str())))
}

fn lower(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(string_arg("lower", args, 0, context)?.to_lowercase().as_str())))
}

fn trim(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(string_arg("trim", args, 0, context)?.trim())))
}

fn starts_with(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let s = string_arg("startsWith", args, 0, context)?;
    let prefix = string_arg("startsWith", args, 1, context)?;
    Ok(JsValue::from(s.starts_with(&prefix)))
}

fn ends_with(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let s = string_arg("endsWith", args, 0, context)?;
    let suffix = string_arg("endsWith", args, 1, context)?;
    Ok(JsValue::from(s.ends_with(&suffix)))
}

fn includes(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let s = string_arg("includes", args, 0, context)?;
    let needle = string_arg("includes", args, 1, context)?;
    Ok(JsValue::from(s.contains(&needle)))
}

fn split(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let s = string_arg("split", args, 0, context)?;
    let sep = string_arg("split", args, 1, context)?;
    let parts: Vec<JsValue> = s.split(sep.as_str()).map(|p| JsValue::from(js_string!(p))).collect();
    Ok(JsValue::from(boa_engine::object::builtins::JsArray::from_iter(parts, context)))
}

fn replace_all(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let s = string_arg("replaceAll", args, 0, context)?;
    let from = string_arg("replaceAll", args, 1, context)?;
    let to = string_arg("replaceAll", args, 2, context)?;
    Ok(JsValue::from(js_string!(s.replace(from.as_str(), to.as_str()).as_str())))
}

fn pad_start(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let s = string_arg("padStart", args, 0, context)?;
    let width = args
        .get(1)
        .ok_or_else(|| arity_error(MODULE, "padStart", "2", args.len()))?
        .to_number(context)? as usize;
    let fill = if args.len() > 2 { string_arg("padStart", args, 2, context)? } else { " ".to_string() };
    let mut padded = s.clone();
    while padded.chars().count() < width && !fill.is_empty() {
        padded = format!("{fill}{padded}");
    }
    Ok(JsValue::from(js_string!(padded.as_str())))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(upper), js_string!("upper"), 1)
        .function(NativeFunction::from_fn_ptr(lower), js_string!("lower"), 1)
        .function(NativeFunction::from_fn_ptr(trim), js_string!("trim"), 1)
        .function(NativeFunction::from_fn_ptr(starts_with), js_string!("startsWith"), 2)
        .function(NativeFunction::from_fn_ptr(ends_with), js_string!("endsWith"), 2)
        .function(NativeFunction::from_fn_ptr(includes), js_string!("includes"), 2)
        .function(NativeFunction::from_fn_ptr(split), js_string!("split"), 2)
        .function(NativeFunction::from_fn_ptr(replace_all), js_string!("replaceAll"), 3)
        .function(NativeFunction::from_fn_ptr(pad_start), js_string!("padStart"), 2)
        .build()
}
