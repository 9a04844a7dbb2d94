//! Run configuration: YAML loading, deep merging and the three-layer
//! resolution (code defaults, per-system method file, CLI JSON override).

pub mod loader;
pub mod merge;

use crate::errors::BenchResult;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub use loader::{load_yaml, parse_simple_yaml};
pub use merge::{deep_merge, load_json_override};

/// A nested string-keyed mapping of scalars and further mappings.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Reserved key the resolved time step is stored under.
pub const DT_KEY: &str = "dt";

/// Built-in method defaults, the lowest configuration layer.
pub fn code_defaults() -> ConfigMap {
    let defaults = json!({
        "library": {"type": "polynomial", "degree": 3, "include_bias": false},
        "optimizer": {"type": "stlsq", "threshold": 0.1},
        "differentiation": {"type": "finite_difference"}
    });
    match defaults {
        Value::Object(map) => map,
        _ => ConfigMap::new(),
    }
}

/// `<system_dir>/configs/<method>.yaml`
pub fn method_config_path(system_dir: &Path, method: &str) -> PathBuf {
    system_dir.join("configs").join(format!("{}.yaml", method))
}

/// Merge defaults, the method file at `method_cfg_path` and the JSON override.
pub fn resolve_run_config(method_cfg_path: &Path, override_json: &str) -> BenchResult<ConfigMap> {
    let method_cfg = load_yaml(method_cfg_path)?;
    let override_cfg = load_json_override(override_json)?;
    tracing::debug!(
        "resolving config from {} ({} keys) with {} override keys",
        method_cfg_path.display(),
        method_cfg.len(),
        override_cfg.len()
    );

    let cfg = deep_merge(&code_defaults(), &method_cfg);
    Ok(deep_merge(&cfg, &override_cfg))
}
