use crate::config::ConfigMap;
use crate::errors::{BenchError, BenchResult};
use serde_json::Value;

/// Recursively merge `override_map` onto `base`.
///
/// Mappings present on both sides are merged key by key; for anything else
/// the override value replaces the base value outright. Neither argument is
/// modified.
pub fn deep_merge(base: &ConfigMap, override_map: &ConfigMap) -> ConfigMap {
    let mut out = base.clone();
    for (key, value) in override_map {
        let merged = match (out.get(key), value) {
            (Some(Value::Object(base_child)), Value::Object(override_child)) => {
                Value::Object(deep_merge(base_child, override_child))
            }
            _ => value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}

/// Parse the `--config-override-json` argument. An empty string means no override.
pub fn load_json_override(s: &str) -> BenchResult<ConfigMap> {
    if s.is_empty() {
        return Ok(ConfigMap::new());
    }
    match serde_json::from_str::<Value>(s)? {
        Value::Object(map) => Ok(map),
        other => Err(BenchError::ConfigError(format!(
            "config override must be a JSON object, got: {}",
            other
        ))),
    }
}
