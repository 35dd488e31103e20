use super::*;

use crate::js_regex::Regex;
use serde_json::Value;

/// Name or value pattern of `:matches-attr()` and `:matches-property()`.
#[derive(Debug, Clone)]
pub(super) enum MatcherArg {
    Literal(String),
    Pattern(Regex),
}

impl MatcherArg {
    /// Accepts `"quoted"`, `/regexp/`, `wild*card` and plain `[\w-]+` arguments.
    pub(super) fn parse(raw: &str, wildcard_allowed: bool) -> Result<Self> {
        let raw = strip_double_quotes(raw);
        if raw.is_empty() {
            return Err(Error::Matching(
                "Argument should be specified. Empty arg is invalid.".into(),
            ));
        }

        if raw.starts_with('/') && raw.ends_with('/') {
            if raw.len() <= 2 {
                return Err(Error::Matching(format!("Invalid regexp: '{raw}'")));
            }
            return Ok(Self::Pattern(Regex::new(&raw[1..raw.len() - 1])?));
        }

        if raw.contains('*') {
            if raw == "*" && !wildcard_allowed {
                return Err(Error::Matching(format!(
                    "Argument should be more specific than {raw}"
                )));
            }
            return Ok(Self::Pattern(Regex::new(&raw.replace('*', ".*"))?));
        }

        if !is_plain_matcher_arg(raw) {
            return Err(Error::Matching(format!("Invalid argument: '{raw}'")));
        }
        Ok(Self::Literal(raw.to_string()))
    }

    pub(super) fn matches(&self, input: &str) -> Result<bool> {
        match self {
            Self::Literal(literal) => Ok(literal == input),
            Self::Pattern(regex) => Ok(regex.is_match(input)?),
        }
    }
}

fn strip_double_quotes(raw: &str) -> &str {
    if raw.len() > 1 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

fn is_plain_matcher_arg(arg: &str) -> bool {
    !arg.is_empty()
        && arg
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

/// Splits a pseudo-class argument at the first `separator` into a trimmed name
/// and value; without a separator the whole argument is the name.
pub(super) fn split_pseudo_arg(arg: &str, separator: char) -> (&str, Option<&str>) {
    match arg.split_once(separator) {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (arg, None),
    }
}

/// Parses a `:matches-property()` name such as `inner./_test/.id` into one
/// matcher per chain link; dots inside `/regexp/` links are kept.
pub(super) fn parse_property_chain(input: &str) -> Result<Vec<MatcherArg>> {
    let input = strip_double_quotes(input);
    let mut patterns: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut in_regexp = false;

    for chunk in input.split('.') {
        if chunk.starts_with('/') && chunk.ends_with('/') && chunk.len() > 2 {
            patterns.push(chunk.to_string());
        } else if chunk.starts_with('/') {
            in_regexp = true;
            buffer.push_str(chunk);
        } else if chunk.ends_with('/') && in_regexp {
            in_regexp = false;
            buffer.push('.');
            buffer.push_str(chunk);
            patterns.push(std::mem::take(&mut buffer));
        } else if in_regexp {
            buffer.push('.');
            buffer.push_str(chunk);
        } else {
            patterns.push(chunk.to_string());
        }
    }

    if !buffer.is_empty() {
        return Err(Error::Matching(format!(
            "Invalid regexp property pattern '{input}'"
        )));
    }

    patterns
        .iter()
        .map(|pattern| {
            if pattern.is_empty() {
                return Err(Error::Matching(format!(
                    "Empty pattern '{pattern}' is invalid in chain '{input}'"
                )));
            }
            MatcherArg::parse(pattern, true).map_err(|err| {
                log::error!("{err}");
                Error::Matching(format!(
                    "Invalid property pattern '{pattern}' in property chain '{input}'"
                ))
            })
        })
        .collect()
}

/// Values reached by walking `chain` from `base`; regexp links fan out over
/// every matching key.
pub(super) fn collect_chain_values(
    base: &Value,
    chain: &[MatcherArg],
    out: &mut Vec<Value>,
) -> Result<()> {
    let Some((first, rest)) = chain.split_first() else {
        return Ok(());
    };

    match first {
        MatcherArg::Literal(name) if !rest.is_empty() => {
            if let Some(next) = own_property(base, name) {
                collect_chain_values(&next, rest, out)?;
            }
        }
        _ => {
            for (key, value) in enumerable_entries(base) {
                if !first.matches(&key)? {
                    continue;
                }
                if rest.is_empty() {
                    out.push(value);
                } else {
                    collect_chain_values(&value, rest, out)?;
                }
            }
        }
    }
    Ok(())
}

fn enumerable_entries(base: &Value) -> Vec<(String, Value)> {
    match base {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, value)| (index.to_string(), value.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

fn own_property(base: &Value, name: &str) -> Option<Value> {
    match base {
        Value::Object(map) => map.get(name).cloned(),
        Value::Array(items) if name == "length" => Some(Value::from(items.len())),
        Value::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
        Value::String(text) if name == "length" => Some(Value::from(text.encode_utf16().count())),
        _ => None,
    }
}

/// Compares a literal matcher with a reflected value after reading the
/// literal as `null`, a boolean or a number when it looks like one.
pub(super) fn literal_equals(literal: &str, value: &Value) -> bool {
    if let Some(number) = js_number(literal) {
        return value.as_f64() == Some(number);
    }
    match literal {
        "undefined" => false,
        "null" => value.is_null(),
        "true" => value.as_bool() == Some(true),
        "false" => value.as_bool() == Some(false),
        _ => value.as_str() == Some(literal),
    }
}

/// String form of a reflected value, as a script would see it when coerced.
pub(super) fn js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(int), _) => int.to_string(),
            (None, Some(float)) => format_js_number(float),
            (None, None) => number.to_string(),
        },
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn format_js_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Numeric reading of `text` the way `Number()` coerces strings; `None` for NaN.
pub(super) fn js_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let (sign, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (-1.0, &trimmed[1..]),
        b'+' => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if unsigned == "Infinity" {
        return Some(sign * f64::INFINITY);
    }

    if unsigned.len() > 2 && sign > 0.0 && trimmed.len() == unsigned.len() {
        let radix = match unsigned.get(..2) {
            Some("0x" | "0X") => Some(16),
            Some("0o" | "0O") => Some(8),
            Some("0b" | "0B") => Some(2),
            _ => None,
        };
        // prefix is ASCII, so byte 2 is a char boundary
        if let Some(radix) = radix {
            return u64::from_str_radix(&unsigned[2..], radix)
                .ok()
                .map(|value| value as f64);
        }
    }

    let is_decimal_literal = !unsigned.is_empty()
        && unsigned
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E' | '+' | '-'))
        && unsigned.chars().any(|ch| ch.is_ascii_digit());
    if !is_decimal_literal {
        return None;
    }
    unsigned.parse::<f64>().ok().map(|value| sign * value)
}
