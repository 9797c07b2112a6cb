use super::{argument_type_error, arity_error};
use boa_engine::object::ObjectInitializer;
use boa_engine::{js_string, Context, JsObject, JsResult, JsValue, NativeFunction};
use std::net::{IpAddr, Ipv4Addr};

const MODULE: &str = "net";

fn string_arg(function: &'static str, args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get(index)
        .ok_or_else(|| arity_error(MODULE, function, "1", args.len()))?
        .to_string(context)?
        .to_std_string_escaped())
}

fn parse_ip(function: &'static str, index: usize, s: &str) -> JsResult<IpAddr> {
    s.parse::<IpAddr>()
        .map_err(|_| argument_type_error(MODULE, function, index, format!("`{s}` is not a valid IP address")))
}

/// `a.b.c.d/n` → `(network_addr, prefix_len)`. Only IPv4 is supported; the
/// built-in table never asks for IPv6 subnetting arithmetic.
fn parse_cidr(function: &'static str, index: usize, cidr: &str) -> JsResult<(Ipv4Addr, u32)> {
    let (addr, len) = cidr
        .split_once('/')
        .ok_or_else(|| argument_type_error(MODULE, function, index, format!("`{cidr}` is not in CIDR form")))?;
    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|_| argument_type_error(MODULE, function, index, format!("`{addr}` is not a valid IPv4 address")))?;
    let len: u32 = len.parse().ok().filter(|n| *n <= 32).ok_or_else(|| {
        argument_type_error(MODULE, function, index, format!("`{len}` is not a valid prefix length"))
    })?;
    Ok((addr, len))
}

fn cidr_contains(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let cidr = string_arg("cidrContains", args, 0, context)?;
    let ip = string_arg("cidrContains", args, 1, context)?;
    let (network, prefix_len) = parse_cidr("cidrContains", 0, &cidr)?;
    let IpAddr::V4(candidate) = parse_ip("cidrContains", 1, &ip)? else {
        return Ok(JsValue::from(false));
    };
    let mask = if prefix_len == 0 { 0u32 } else { u32::MAX << (32 - prefix_len) };
    let matches = (u32::from(network) & mask) == (u32::from(candidate) & mask);
    Ok(JsValue::from(matches))
}

fn classify(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let ip = string_arg("classify", args, 0, context)?;
    let addr = parse_ip("classify", 0, &ip)?;
    let class = match addr {
        IpAddr::V4(v4) => {
            if v4.is_loopback() {
                "loopback"
            } else if v4.is_private() {
                "private"
            } else if v4.is_link_local() {
                "link-local"
            } else if v4.is_multicast() {
                "multicast"
            } else if v4.is_unspecified() {
                "unspecified"
            } else if v4.is_broadcast() {
                "broadcast"
            } else {
                "public"
            }
        }
        IpAddr::V6(v6) => {
            if v6.is_loopback() {
                "loopback"
            } else if v6.is_multicast() {
                "multicast"
            } else if v6.is_unspecified() {
                "unspecified"
            } else {
                "public"
            }
        }
    };
    Ok(JsValue::from(js_string!(class)))
}

fn is_valid_ip(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let ip = string_arg("isValidIp", args, 0, context)?;
    Ok(JsValue::from(ip.parse::<IpAddr>().is_ok()))
}

pub fn install(ctx: &mut Context) -> JsObject {
    ObjectInitializer::new(ctx)
        .function(NativeFunction::from_fn_ptr(cidr_contains), js_string!("cidrContains"), 2)
        .function(NativeFunction::from_fn_ptr(classify), js_string!("classify"), 1)
        .function(NativeFunction::from_fn_ptr(is_valid_ip), js_string!("isValidIp"), 1)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_math_matches_expectation() {
        let (network, len) = parse_cidr("test", 0, "10.0.0.0/8").unwrap();
        assert_eq!(network, Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(len, 8);
    }
}
