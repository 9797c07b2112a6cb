use super::{argument_type_error, arity_error, builtin_failure};
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};
use chrono::{DateTime, SecondsFormat, Utc};

const MODULE: &str = "time";

fn string_arg(function: &'static str, args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped())
}

fn seconds_arg(function: &'static str, args: &[JsValue], index: usize, context: &mut Context) -> JsResult<f64> {
    args.get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .to_number(context)
}

fn parse_epoch_seconds(function: &'static str, s: &str) -> JsResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| argument_type_error(MODULE, function, 0, e.to_string()))
}

/// `time.now` returns an injected execution timestamp when the VM's global
/// object carries one, falling back to wall-clock time.
fn now(_this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let injected = context
        .global_object()
        .get(js_string!("__policy_injected_now_seconds"), context)?;
    if !injected.is_undefined() {
        return Ok(injected);
    }
    Ok(JsValue::from(Utc::now().timestamp() as f64))
}

fn parse(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg("parse", args, 0, context)?;
    let dt = parse_epoch_seconds("parse", &input)?;
    Ok(JsValue::from(dt.timestamp() as f64))
}

fn format(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let seconds = seconds_arg("format", args, 0, context)?;
    let dt = DateTime::<Utc>::from_timestamp(seconds as i64, 0)
        .ok_or_else(|| builtin_failure(MODULE, "format", "timestamp out of range"))?;
    Ok(JsValue::from(js_string!(dt.to_rfc3339_opts(SecondsFormat::Secs, true).as_str())))
}

fn add_seconds(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let seconds = seconds_arg("add", args, 0, context)?;
    let delta = seconds_arg("add", args, 1, context)?;
    Ok(JsValue::from(seconds + delta))
}

fn subtract_seconds(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let seconds = seconds_arg("subtract", args, 0, context)?;
    let delta = seconds_arg("subtract", args, 1, context)?;
    Ok(JsValue::from(seconds - delta))
}

fn is_before(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let a = seconds_arg("isBefore", args, 0, context)?;
    let b = seconds_arg("isBefore", args, 1, context)?;
    Ok(JsValue::from(a < b))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(now), js_string!("now"), 0)
        .function(NativeFunction::from_fn_ptr(parse), js_string!("parse"), 1)
        .function(NativeFunction::from_fn_ptr(format), js_string!("format"), 1)
        .function(NativeFunction::from_fn_ptr(add_seconds), js_string!("add"), 2)
        .function(NativeFunction::from_fn_ptr(subtract_seconds), js_string!("subtract"), 2)
        .function(NativeFunction::from_fn_ptr(is_before), js_string!("isBefore"), 2)
        .build()
}
