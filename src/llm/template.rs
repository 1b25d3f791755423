//! Template composer - fills `{dotted.path}` placeholders from a context
//!
//! A placeholder whose path does not resolve is left in the output verbatim,
//! so missing context shows up in the final prompt instead of failing.
//! Structured values (objects, arrays) render as indented JSON. Composition
//! is pure: no logging, no I/O, no hidden state.

use serde::Serialize;
use serde_json::Value;

use crate::core::error::Result;

/// Fill every placeholder in `template` from `context`
pub fn compose(template: &str, context: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if close > 0 => {
                let path = &after[..close];
                match resolve(context, path) {
                    Some(value) => out.push_str(&render(value)),
                    None => out.push_str(&rest[open..open + close + 2]),
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Serialize a typed context once, then compose from it
pub fn compose_from<C: Serialize>(template: &str, context: &C) -> Result<String> {
    let value = serde_json::to_value(context)?;
    Ok(compose(template, &value))
}

/// Successive key lookup; array segments are indices
fn resolve<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |node, key| match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => render_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        structured => serde_json::to_string_pretty(structured).unwrap_or_else(|_| structured.to_string()),
    }
}

/// Integral floats print without a trailing `.0`
fn render_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}
