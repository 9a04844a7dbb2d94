use crate::config::ConfigMap;
use crate::errors::BenchResult;
use serde_json::{Number, Value};
use std::fs;
use std::path::Path;

/// Load a YAML mapping from `path`.
///
/// A missing file is an empty mapping. `serde_yaml` is tried first; if it
/// rejects the document (or the document is not a mapping) the restricted
/// line parser in [`parse_simple_yaml`] is used instead.
pub fn load_yaml<P: AsRef<Path>>(path: P) -> BenchResult<ConfigMap> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ConfigMap::new());
    }
    let content = fs::read_to_string(path)?;

    match parse_full_yaml(&content) {
        Ok(map) => Ok(map),
        Err(reason) => {
            tracing::debug!(
                "falling back to the restricted parser for {}: {}",
                path.display(),
                reason
            );
            Ok(parse_simple_yaml(&content))
        }
    }
}

fn parse_full_yaml(content: &str) -> Result<ConfigMap, String> {
    let yaml_value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    let json_value: Value = serde_json::to_value(yaml_value).map_err(|e| e.to_string())?;

    match json_value {
        Value::Null => Ok(ConfigMap::new()),
        Value::Object(map) => Ok(map),
        other => Err(format!("top-level value is not a mapping: {}", other)),
    }
}

struct Line<'a> {
    indent: usize,
    key: &'a str,
    raw: &'a str,
}

/// Restricted YAML subset: `key: value` lines, nesting by indentation.
///
/// A key with an empty value opens a child mapping whose lines are expected
/// at exactly two more spaces than the key. The child indentation is never
/// measured, so files indented by four spaces still nest, but a sibling at
/// +1 or +3 lands in the child too.
pub fn parse_simple_yaml(content: &str) -> ConfigMap {
    let lines: Vec<Line<'_>> = content
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let indent = line.len() - line.trim_start_matches(' ').len();
            let (key, raw) = trimmed.split_once(':')?;
            Some(Line {
                indent,
                key: key.trim(),
                raw: raw.trim(),
            })
        })
        .collect();

    let mut pos = 0;
    parse_block(&lines, &mut pos, 0)
}

// Each call owns one stack frame; returning pops it.
fn parse_block(lines: &[Line<'_>], pos: &mut usize, level: usize) -> ConfigMap {
    let mut map = ConfigMap::new();
    while let Some(line) = lines.get(*pos) {
        if line.indent < level {
            break;
        }
        *pos += 1;
        let value = if line.raw.is_empty() {
            Value::Object(parse_block(lines, pos, line.indent + 2))
        } else {
            parse_scalar(line.raw)
        };
        map.insert(line.key.to_string(), value);
    }
    map
}

fn parse_scalar(raw: &str) -> Value {
    let v = raw.trim();
    if v.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if v.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    let number = if v.contains('.') {
        v.parse::<f64>().ok().and_then(Number::from_f64)
    } else {
        v.parse::<i64>().ok().map(Number::from)
    };

    match number {
        Some(n) => Value::Number(n),
        None => Value::String(v.trim_matches('"').trim_matches('\'').to_string()),
    }
}
