//! Strategies over JSON records.

use catsnap_core::VariantDescriptor;
use serde_json::Value;

use super::price::parse_price;
use super::text::{collapse_whitespace, parse_availability};

/// Resolve a dotted path. `*` fans out over array elements or object
/// values; a key applied to an array is applied to each element.
pub(crate) fn resolve<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![root];
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let mut next = Vec::new();
        for value in current {
            step(value, segment, &mut next);
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }
    current
}

fn step<'a>(value: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
    match (value, segment) {
        (Value::Array(items), "*") => out.extend(items.iter()),
        (Value::Object(map), "*") => out.extend(map.values()),
        (Value::Array(items), _) => {
            if let Ok(index) = segment.parse::<usize>() {
                out.extend(items.get(index));
            } else {
                for item in items {
                    step(item, segment, out);
                }
            }
        }
        (Value::Object(map), key) => out.extend(map.get(key)),
        _ => {}
    }
}

/// Scalar leaves of `value` as strings. Arrays are flattened, objects and
/// nulls contribute nothing.
pub(crate) fn scalar_texts(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => {
            for item in items {
                scalar_texts(item, out);
            }
        }
        Value::Object(_) | Value::Null => {}
    }
}

pub(crate) fn path_texts(root: &Value, path: &str) -> Vec<String> {
    let mut out = Vec::new();
    for value in resolve(root, path) {
        scalar_texts(value, &mut out);
    }
    out
}

fn first_text(root: &Value, path: &str) -> Option<String> {
    path_texts(root, path)
        .into_iter()
        .map(|t| collapse_whitespace(&t))
        .find(|t| !t.is_empty())
}

/// Every string leaf in the record, one per line. Used by text patterns.
pub(crate) fn all_text(root: &Value) -> String {
    fn walk(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.push(s.clone()),
            Value::Number(n) => out.push(n.to_string()),
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            Value::Object(map) => map.values().for_each(|v| walk(v, out)),
            Value::Bool(_) | Value::Null => {}
        }
    }
    let mut out = Vec::new();
    walk(root, &mut out);
    out.join("\n")
}

/// Field names inside each variant object.
pub(crate) struct VariantFields<'a> {
    pub name: &'a [String],
    pub hex: Option<&'a str>,
    pub price: Option<&'a str>,
    pub compare_price: Option<&'a str>,
    pub available: Option<&'a str>,
    pub sku: Option<&'a str>,
}

pub(crate) fn variants(root: &Value, path: &str, fields: &VariantFields<'_>) -> Vec<VariantDescriptor> {
    let mut objects = Vec::new();
    for value in resolve(root, path) {
        match value {
            Value::Array(items) => objects.extend(items.iter().filter(|v| v.is_object())),
            Value::Object(_) => objects.push(value),
            _ => {}
        }
    }

    objects
        .into_iter()
        .map(|item| {
            let lookup = |p: Option<&str>| p.and_then(|p| first_text(item, p));
            VariantDescriptor {
                name: fields
                    .name
                    .iter()
                    .find_map(|p| first_text(item, p))
                    .unwrap_or_default(),
                hex: lookup(fields.hex),
                sku: lookup(fields.sku),
                price: lookup(fields.price).and_then(|t| parse_price(&t)),
                compare_price: lookup(fields.compare_price).and_then(|t| parse_price(&t)),
                in_stock: lookup(fields.available).and_then(|t| parse_availability(&t)),
            }
        })
        .filter(|v| *v != VariantDescriptor::default())
        .collect()
}

/// Key/value pairs from `[{key, value}, ...]` or from a flat object.
pub(crate) fn spec_pairs(root: &Value, path: &str, key: &str, value: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for node in resolve(root, path) {
        match node {
            Value::Array(items) => {
                for item in items {
                    if let (Some(k), Some(v)) = (first_text(item, key), first_text(item, value)) {
                        pairs.push((k, v));
                    }
                }
            }
            Value::Object(map) => {
                for (k, v) in map {
                    let mut texts = Vec::new();
                    scalar_texts(v, &mut texts);
                    let joined = collapse_whitespace(&texts.join(", "));
                    if !joined.is_empty() {
                        pairs.push((k.clone(), joined));
                    }
                }
            }
            _ => {}
        }
    }
    pairs
}
