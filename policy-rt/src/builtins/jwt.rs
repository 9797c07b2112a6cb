//! `decode`/`verify`/`getPayload`/`getHeader` for HS256/384/512-signed JWTs.
//!
//! No JWT crate is in the dependency stack; this composes `hmac` and `sha2`
//! directly rather than pulling in a dedicated JWT library.

use super::{arity_error, builtin_failure};
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine;
use boa_engine::object::builtins::JsArray;
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};

const MODULE: &str = "jwt";

struct Parts {
    header_b64: String,
    payload_b64: String,
    signature_b64: String,
    header_json: serde_json::Value,
    payload_json: serde_json::Value,
}

fn split_token(token: &str) -> Result<Parts, String> {
    let mut segments = token.split('.');
    let header_b64 = segments.next().ok_or("missing header segment")?.to_string();
    let payload_b64 = segments.next().ok_or("missing payload segment")?.to_string();
    let signature_b64 = segments.next().ok_or("missing signature segment")?.to_string();
    if segments.next().is_some() {
        return Err("token has more than three segments".into());
    }
    let header_bytes = BASE64URL.decode(&header_b64).map_err(|e| e.to_string())?;
    let payload_bytes = BASE64URL.decode(&payload_b64).map_err(|e| e.to_string())?;
    let header_json: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| e.to_string())?;
    let payload_json: serde_json::Value = serde_json::from_slice(&payload_bytes).map_err(|e| e.to_string())?;
    Ok(Parts {
        header_b64,
        payload_b64,
        signature_b64,
        header_json,
        payload_json,
    })
}

fn signature_matches(alg: &str, signing_input: &str, key: &[u8], signature_b64: &str) -> Result<bool, String> {
    let expected: Vec<u8> = BASE64URL.decode(signature_b64).map_err(|e| e.to_string())?;
    let message = signing_input.as_bytes();
    let actual = match alg {
        "HS256" => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|e| e.to_string())?;
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        "HS384" => {
            let mut mac = Hmac::<Sha384>::new_from_slice(key).map_err(|e| e.to_string())?;
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        "HS512" => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key).map_err(|e| e.to_string())?;
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        other => return Err(format!("unsupported algorithm {other}")),
    };
    Ok(actual == expected)
}

fn json_to_js(value: &serde_json::Value, context: &mut Context) -> JsResult<JsValue> {
    match value {
        serde_json::Value::Null => Ok(JsValue::null()),
        serde_json::Value::Bool(b) => Ok(JsValue::from(*b)),
        serde_json::Value::Number(n) => Ok(JsValue::from(n.as_f64().unwrap_or(f64::NAN))),
        serde_json::Value::String(s) => Ok(JsValue::from(js_string!(s.as_str()))),
        serde_json::Value::Array(items) => {
            let mut js_items = Vec::with_capacity(items.len());
            for item in items {
                js_items.push(json_to_js(item, context)?);
            }
            Ok(JsValue::from(JsArray::from_iter(js_items, context)))
        }
        serde_json::Value::Object(map) => {
            let obj = boa_engine::object::JsObject::with_object_proto(context.intrinsics());
            for (k, v) in map {
                let js_value = json_to_js(v, context)?;
                obj.set(js_string!(k.as_str()), js_value, true, context)?;
            }
            Ok(JsValue::from(obj))
        }
    }
}

fn string_arg(function: &'static str, args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped())
}

fn decode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let token = string_arg("decode", args, 0, context)?;
    let parts = split_token(&token).map_err(|e| builtin_failure(MODULE, "decode", e))?;
    let obj = boa_engine::object::JsObject::with_object_proto(context.intrinsics());
    let header = json_to_js(&parts.header_json, context)?;
    let payload = json_to_js(&parts.payload_json, context)?;
    obj.set(js_string!("header"), header, true, context)?;
    obj.set(js_string!("payload"), payload, true, context)?;
    Ok(JsValue::from(obj))
}

fn get_header(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let token = string_arg("getHeader", args, 0, context)?;
    let parts = split_token(&token).map_err(|e| builtin_failure(MODULE, "getHeader", e))?;
    json_to_js(&parts.header_json, context)
}

fn get_payload(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let token = string_arg("getPayload", args, 0, context)?;
    let parts = split_token(&token).map_err(|e| builtin_failure(MODULE, "getPayload", e))?;
    json_to_js(&parts.payload_json, context)
}

fn verify(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let token = string_arg("verify", args, 0, context)?;
    let key = string_arg("verify", args, 1, context)?;
    let parts = split_token(&token).map_err(|e| builtin_failure(MODULE, "verify", e))?;
    let alg = parts
        .header_json
        .get("alg")
        .and_then(|v| v.as_str())
        .ok_or_else(|| builtin_failure(MODULE, "verify", "header has no `alg`"))?;
    let signing_input = format!("{}.{}", parts.header_b64, parts.payload_b64);
    let matches = signature_matches(alg, &signing_input, key.as_bytes(), &parts.signature_b64)
        .map_err(|e| builtin_failure(MODULE, "verify", e))?;
    Ok(JsValue::from(matches))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(decode), js_string!("decode"), 1)
        .function(NativeFunction::from_fn_ptr(verify), js_string!("verify"), 2)
        .function(NativeFunction::from_fn_ptr(get_payload), js_string!("getPayload"), 1)
        .function(NativeFunction::from_fn_ptr(get_header), js_string!("getHeader"), 1)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_token_rejects_malformed_input() {
        assert!(split_token("only-one-segment").is_err());
    }
}
