use super::{arity_error, builtin_failure};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};

const MODULE: &str = "encoding";

fn string_arg(function: &'static str, args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped())
}

fn base64_encode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg("base64Encode", args, 0, context)?;
    Ok(JsValue::from(js_string!(BASE64.encode(input.as_bytes()).as_str())))
}

fn base64_decode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg("base64Decode", args, 0, context)?;
    let bytes = BASE64
        .decode(input.as_bytes())
        .map_err(|e| builtin_failure(MODULE, "base64Decode", e.to_string()))?;
    let decoded = String::from_utf8(bytes).map_err(|e| builtin_failure(MODULE, "base64Decode", e.to_string()))?;
    Ok(JsValue::from(js_string!(decoded.as_str())))
}

fn hex_encode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg("hexEncode", args, 0, context)?;
    Ok(JsValue::from(js_string!(hex::encode(input.as_bytes()).as_str())))
}

fn hex_decode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg("hexDecode", args, 0, context)?;
    let bytes = hex::decode(&input).map_err(|e| builtin_failure(MODULE, "hexDecode", e.to_string()))?;
    let decoded = String::from_utf8(bytes).map_err(|e| builtin_failure(MODULE, "hexDecode", e.to_string()))?;
    Ok(JsValue::from(js_string!(decoded.as_str())))
}

/// Percent-encodes everything outside the RFC 3986 "unreserved" set. No
/// crate in the dependency stack covers URL-safe encoding, so it is
/// hand-rolled.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn percent_decode(s: &str) -> Result<String, String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex_pair = s
                .get(i + 1..i + 3)
                .ok_or_else(|| "truncated percent-escape".to_string())?;
            let byte = u8::from_str_radix(hex_pair, 16).map_err(|e| e.to_string())?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|e| e.to_string())
}

fn url_encode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg("urlEncode", args, 0, context)?;
    Ok(JsValue::from(js_string!(percent_encode(&input).as_str())))
}

fn url_decode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg("urlDecode", args, 0, context)?;
    let decoded = percent_decode(&input).map_err(|e| builtin_failure(MODULE, "urlDecode", e))?;
    Ok(JsValue::from(js_string!(decoded.as_str())))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(base64_encode), js_string!("base64Encode"), 1)
        .function(NativeFunction::from_fn_ptr(base64_decode), js_string!("base64Decode"), 1)
        .function(NativeFunction::from_fn_ptr(hex_encode), js_string!("hexEncode"), 1)
        .function(NativeFunction::from_fn_ptr(hex_decode), js_string!("hexDecode"), 1)
        .function(NativeFunction::from_fn_ptr(url_encode), js_string!("urlEncode"), 1)
        .function(NativeFunction::from_fn_ptr(url_decode), js_string!("urlDecode"), 1)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_round_trips() {
        let encoded = percent_encode("a b/c=d");
        assert_eq!(percent_decode(&encoded).unwrap(), "a b/c=d");
    }
}
