use super::{argument_type_error, arity_error};
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

const MODULE: &str = "hash";

fn string_arg(function: &'static str, args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped())
}

fn sha256(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg("sha256", args, 0, context)?;
    let digest = Sha256::digest(input.as_bytes());
    Ok(JsValue::from(js_string!(hex::encode(digest).as_str())))
}

fn sha512(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg("sha512", args, 0, context)?;
    let digest = Sha512::digest(input.as_bytes());
    Ok(JsValue::from(js_string!(hex::encode(digest).as_str())))
}

fn hmac_sha256(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let message = string_arg("hmacSha256", args, 0, context)?;
    let key = string_arg("hmacSha256", args, 1, context)?;
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key.as_bytes()).map_err(|e| argument_type_error(MODULE, "hmacSha256", 1, e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(JsValue::from(js_string!(hex::encode(mac.finalize().into_bytes()).as_str())))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(sha256), js_string!("sha256"), 1)
        .function(NativeFunction::from_fn_ptr(sha512), js_string!("sha512"), 1)
        .function(NativeFunction::from_fn_ptr(hmac_sha256), js_string!("hmacSha256"), 2)
        .build()
}
