use super::{argument_type_error, arity_error};
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};

const MODULE: &str = "uuid";

fn v4(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(::uuid::Uuid::new_v4().to_string().as_str())))
}

fn v6(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    let ts = ::uuid::Timestamp::now(::uuid::NoContext);
    let node_id: [u8; 6] = ::uuid::Uuid::new_v4().as_bytes()[..6].try_into().expect("six bytes");
    Ok(JsValue::from(js_string!(::uuid::Uuid::new_v6(ts, &node_id).to_string().as_str())))
}

fn v7(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(::uuid::Uuid::now_v7().to_string().as_str())))
}

fn is_valid(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let s = args
        .first()
        .ok_or_else(|| arity_error(MODULE, "isValid", "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped();
    Ok(JsValue::from(::uuid::Uuid::parse_str(&s).is_ok()))
}

fn version(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let s = args
        .first()
        .ok_or_else(|| arity_error(MODULE, "version", "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped();
    let parsed = ::uuid::Uuid::parse_str(&s).map_err(|e| argument_type_error(MODULE, "version", 0, e.to_string()))?;
    Ok(JsValue::from(parsed.get_version_num() as f64))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(v4), js_string!("v4"), 0)
        .function(NativeFunction::from_fn_ptr(v6), js_string!("v6"), 0)
        .function(NativeFunction::from_fn_ptr(v7), js_string!("v7"), 0)
        .function(NativeFunction::from_fn_ptr(is_valid), js_string!("isValid"), 1)
        .function(NativeFunction::from_fn_ptr(version), js_string!("version"), 1)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_exposes_all_five_functions() {
        let mut context = Context::default();
        let exports = install(&mut context);
        for name in ["v4", "v6", "v7", "isValid", "version"] {
            assert!(
                exports.has_property(js_string!(name), &mut context).unwrap(),
                "missing uuid.{name}"
            );
        }
    }
}
