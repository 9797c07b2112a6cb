use super::{arity_error, builtin_failure};
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};

const MODULE: &str = "math";

fn number_arg(function: &'static str, args: &[JsValue], index: usize, context: &mut Context) -> JsResult<f64> {
    args.get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .to_number(context)
}

fn abs(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(number_arg("abs", args, 0, context)?.abs()))
}

fn max(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    if args.is_empty() {
        return Err(arity_error(MODULE, "max", "1+", 0));
    }
    let mut best = f64::NEG_INFINITY;
    for i in 0..args.len() {
        best = best.max(number_arg("max", args, i, context)?);
    }
    Ok(JsValue::from(best))
}

fn min(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    if args.is_empty() {
        return Err(arity_error(MODULE, "min", "1+", 0));
    }
    let mut best = f64::INFINITY;
    for i in 0..args.len() {
        best = best.min(number_arg("min", args, i, context)?);
    }
    Ok(JsValue::from(best))
}

fn round(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(number_arg("round", args, 0, context)?.round()))
}

fn floor(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(number_arg("floor", args, 0, context)?.floor()))
}

fn ceil(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(number_arg("ceil", args, 0, context)?.ceil()))
}

fn pow(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let base = number_arg("pow", args, 0, context)?;
    let exponent = number_arg("pow", args, 1, context)?;
    Ok(JsValue::from(base.powf(exponent)))
}

fn sqrt(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let n = number_arg("sqrt", args, 0, context)?;
    if n < 0.0 {
        return Err(builtin_failure(MODULE, "sqrt", "argument must be non-negative"));
    }
    Ok(JsValue::from(n.sqrt()))
}

fn clamp(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let n = number_arg("clamp", args, 0, context)?;
    let lo = number_arg("clamp", args, 1, context)?;
    let hi = number_arg("clamp", args, 2, context)?;
    Ok(JsValue::from(n.clamp(lo, hi)))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(abs), js_string!("abs"), 1)
        .function(NativeFunction::from_fn_ptr(max), js_string!("max"), 2)
        .function(NativeFunction::from_fn_ptr(min), js_string!("min"), 2)
        .function(NativeFunction::from_fn_ptr(round), js_string!("round"), 1)
        .function(NativeFunction::from_fn_ptr(floor), js_string!("floor"), 1)
        .function(NativeFunction::from_fn_ptr(ceil), js_string!("ceil"), 1)
        .function(NativeFunction::from_fn_ptr(pow), js_string!("pow"), 2)
        .function(NativeFunction::from_fn_ptr(sqrt), js_string!("sqrt"), 1)
        .function(NativeFunction::from_fn_ptr(clamp), js_string!("clamp"), 3)
        .build()
}
