use super::{argument_type_error, arity_error};
use boa_engine::object::builtins::JsArray;
use boa_engine::object::ObjectInitializer;
use boa_engine::property::PropertyKey;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};

const MODULE: &str = "collection";

fn array_arg(function: &'static str, args: &[JsValue], index: usize) -> JsResult<JsArray> {
    let value = args.get(index).ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?;
    JsArray::from_object(
        value
            .as_object()
            .cloned()
            .ok_or_else(|| argument_type_error(MODULE, function, index, "expected an array"))?,
    )
    .map_err(|_| argument_type_error(MODULE, function, index, "expected an array"))
}

fn object_arg(function: &'static str, args: &[JsValue], index: usize) -> JsResult<JsObject> {
    args.get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .as_object()
        .cloned()
        .ok_or_else(|| argument_type_error(MODULE, function, index, "expected an object"))
}

fn list_includes(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = array_arg("listIncludes", args, 0)?;
    let needle = args.get(1).ok_or_else(|| arity_error(MODULE, "listIncludes", "2", args.len()))?;
    let len = list.length(context)?;
    for i in 0..len {
        let item = list.get(i, context)?;
        if item.strict_equals(needle) {
            return Ok(JsValue::from(true));
        }
    }
    Ok(JsValue::from(false))
}

fn list_unique(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = array_arg("listUnique", args, 0)?;
    let len = list.length(context)?;
    let mut seen: Vec<JsValue> = Vec::new();
    for i in 0..len {
        let item = list.get(i, context)?;
        if !seen.iter().any(|existing| existing.strict_equals(&item)) {
            seen.push(item);
        }
    }
    Ok(JsValue::from(JsArray::from_iter(seen, context)))
}

fn list_flatten(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let list = array_arg("listFlatten", args, 0)?;
    let len = list.length(context)?;
    let mut out = Vec::new();
    for i in 0..len {
        let item = list.get(i, context)?;
        if let Some(obj) = item.as_object() {
            if let Ok(inner) = JsArray::from_object(obj.clone()) {
                let inner_len = inner.length(context)?;
                for j in 0..inner_len {
                    out.push(inner.get(j, context)?);
                }
                continue;
            }
        }
        out.push(item);
    }
    Ok(JsValue::from(JsArray::from_iter(out, context)))
}

fn map_keys(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let obj = object_arg("mapKeys", args, 0)?;
    let keys: Vec<JsValue> = obj
        .own_property_keys(context)?
        .into_iter()
        .filter_map(|key| match key {
            PropertyKey::String(s) => Some(JsValue::from(s.clone())),
            _ => None,
        })
        .collect();
    Ok(JsValue::from(JsArray::from_iter(keys, context)))
}

fn map_values(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let obj = object_arg("mapValues", args, 0)?;
    let keys = obj.own_property_keys(context)?;
    let mut values = Vec::with_capacity(keys.len());
    for key in keys {
        if let PropertyKey::String(name) = key {
            values.push(obj.get(name.clone(), context)?);
        }
    }
    Ok(JsValue::from(JsArray::from_iter(values, context)))
}

fn map_has(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let obj = object_arg("mapHas", args, 0)?;
    let key = args
        .get(1)
        .ok_or_else(|| arity_error(MODULE, "mapHas", "2", args.len()))?
        .to_string(context)?;
    Ok(JsValue::from(obj.has_property(key, context)?))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(list_includes), js_string!("listIncludes"), 2)
        .function(NativeFunction::from_fn_ptr(list_unique), js_string!("listUnique"), 1)
        .function(NativeFunction::from_fn_ptr(list_flatten), js_string!("listFlatten"), 1)
        .function(NativeFunction::from_fn_ptr(map_keys), js_string!("mapKeys"), 1)
        .function(NativeFunction::from_fn_ptr(map_values), js_string!("mapValues"), 1)
        .function(NativeFunction::from_fn_ptr(map_has), js_string!("mapHas"), 2)
        .build()
}
