use std::sync::LazyLock;

use regex_lite::Regex;
use serde_json::Value;

use crate::errors::{DesignError, Result};

static RANGE_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^0-9]*)([0-9].*)$").expect("range item regex"));
static RANGE_COMPONENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)(?:-([0-9]+))?$").expect("range component regex"));

/// Upper bound on the number of names one range item may expand to
const MAX_RANGE_ITEMS: usize = 65_536;

/// Look up a dotted path (e.g. "wan_ha.ipsec") in a nested mapping.
/// A JSON null counts as absent.
pub fn get<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Same as [`get`] but a missing value is a `MissingVariable` error naming the path
pub fn get_required<'a>(data: &'a Value, path: &str) -> Result<&'a Value> {
    get(data, path).ok_or_else(|| DesignError::missing(format!("'{}' is required", path)))
}

/// Dotted-path lookup of a string, falling back to `default`
pub fn get_str_or<'a>(data: &'a Value, path: &str, default: &'a str) -> &'a str {
    get(data, path).and_then(Value::as_str).unwrap_or(default)
}

/// Dotted-path lookup of a boolean, falling back to `default`
pub fn get_bool_or(data: &Value, path: &str, default: bool) -> bool {
    get(data, path).and_then(Value::as_bool).unwrap_or(default)
}

/// Expand a compact range string into the list of names it covers.
///
/// "Ethernet1-3,5" -> Ethernet1, Ethernet2, Ethernet3, Ethernet5
/// "Ethernet1/1-2" -> Ethernet1/1, Ethernet1/2
/// "Ethernet1-2/1" -> Ethernet1/1, Ethernet2/1
/// "Ethernet1.10-11" -> Ethernet1.10, Ethernet1.11
///
/// An item without a prefix reuses the prefix of the previous item.
pub fn range_expand(range_to_expand: &str) -> Result<Vec<String>> {
    let mut result = Vec::new();
    let mut prefix = String::new();

    for item in range_to_expand.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        let caps = RANGE_ITEM_RE
            .captures(item)
            .ok_or_else(|| DesignError::config(format!("Invalid range, got '{}'", item)))?;
        let item_prefix = caps.get(1).map_or("", |m| m.as_str());
        if !item_prefix.is_empty() {
            prefix = item_prefix.to_string();
        }
        let body = caps.get(2).map_or("", |m| m.as_str());

        let mut expanded = vec![String::new()];
        for (separator, component) in split_components(body) {
            let (start, end) = parse_component(component, item)?;
            let count = expanded
                .len()
                .checked_mul((end - start) as usize + 1)
                .filter(|count| *count <= MAX_RANGE_ITEMS)
                .ok_or_else(|| {
                    DesignError::config(format!(
                        "Range '{}' expands to more than {} items",
                        item, MAX_RANGE_ITEMS
                    ))
                })?;
            let mut next = Vec::with_capacity(count);
            for base in &expanded {
                for n in start..=end {
                    next.push(format!("{}{}{}", base, separator, n));
                }
            }
            expanded = next;
        }

        result.extend(expanded.into_iter().map(|s| format!("{}{}", prefix, s)));
    }

    Ok(result)
}

/// Split "1/1-4.10" into ("", "1"), ("/", "1-4"), (".", "10")
fn split_components(body: &str) -> Vec<(&str, &str)> {
    let mut components = Vec::new();
    let mut separator = "";
    let mut start = 0;
    for (i, c) in body.char_indices() {
        if c == '/' || c == '.' {
            components.push((separator, &body[start..i]));
            separator = &body[i..i + 1];
            start = i + 1;
        }
    }
    components.push((separator, &body[start..]));
    components
}

fn parse_component(component: &str, item: &str) -> Result<(u32, u32)> {
    let caps = RANGE_COMPONENT_RE
        .captures(component)
        .ok_or_else(|| DesignError::config(format!("Invalid range, got '{}'", item)))?;
    let parse = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| DesignError::config(format!("Invalid range, got '{}'", item)))
    };
    let start = parse(caps.get(1).map_or("", |m| m.as_str()))?;
    let end = match caps.get(2) {
        Some(m) => parse(m.as_str())?,
        None => start,
    };
    if end < start {
        return Err(DesignError::config(format!(
            "Invalid range, start is larger than end in '{}'",
            item
        )));
    }
    Ok((start, end))
}

/// Recursively drop null, "", [] and {} values. false and 0 are kept.
pub fn strip_empties(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter_map(|(key, value)| {
                    let value = strip_empties(value);
                    (!is_empty(&value)).then_some((key, value))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(strip_empties)
                .filter(|value| !is_empty(value))
                .collect(),
        ),
        other => other,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Remove the "/len" suffix from an address, e.g. "10.0.0.1/31" -> "10.0.0.1"
pub fn strip_mask(ip_address: &str) -> &str {
    ip_address.split('/').next().unwrap_or(ip_address)
}

/// Make an interface name usable inside another identifier
/// e.g., "Ethernet1/1" -> "Ethernet1_1"
pub fn sanitize_interface_name(interface_name: &str) -> String {
    interface_name.replace('/', "_")
}
