use super::arity_error;
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};

const MODULE: &str = "json";

fn is_valid(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = args
        .first()
        .ok_or_else(|| arity_error(MODULE, "isValid", "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped();
    Ok(JsValue::from(serde_json::from_str::<serde_json::Value>(&input).is_ok()))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(is_valid), js_string!("isValid"), 1)
        .build()
}
