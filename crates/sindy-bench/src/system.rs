use crate::config::{load_yaml, ConfigMap};
use crate::errors::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const SYSTEM_FILE: &str = "system.yaml";

/// Dataset file extensions, in the order they are probed.
pub const DATA_EXTENSIONS: [&str; 3] = ["npz", "npy", "csv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Csv,
    Npy,
    Npz,
}

/// Per-system dataset metadata read from `system.yaml`.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSpec {
    pub name: String,
    pub data_format: DataFormat,
    pub has_header: bool,
    pub delimiter: String,
    pub x_columns: Option<Vec<usize>>,
    pub dims: Option<usize>,
    pub dt_default: Option<f64>,
}

impl SystemSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_format: DataFormat::Csv,
            has_header: false,
            delimiter: ",".to_string(),
            x_columns: None,
            dims: None,
            dt_default: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SystemFile {
    name: Option<Value>,
    data_format: DataFormat,
    has_header: bool,
    delimiter: Option<String>,
    x_columns: Option<Vec<usize>>,
    dims: Option<usize>,
    dt: Option<f64>,
}

/// Read `<system_dir>/system.yaml`. A missing file yields the defaults with
/// the name taken from the directory.
pub fn load_system_spec(system_dir: &Path) -> BenchResult<SystemSpec> {
    let path = system_dir.join(SYSTEM_FILE);
    let cfg: ConfigMap = load_yaml(&path)?;
    let file: SystemFile = serde_json::from_value(Value::Object(cfg)).map_err(|e| {
        BenchError::ConfigError(format!("invalid {}: {}", path.display(), e))
    })?;

    let name = match file.name {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => system_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        Some(other) => other.to_string(),
    };

    let mut spec = SystemSpec::named(name);
    spec.data_format = file.data_format;
    spec.has_header = file.has_header;
    if let Some(delimiter) = file.delimiter {
        spec.delimiter = delimiter;
    }
    spec.x_columns = file.x_columns;
    spec.dims = file.dims;
    spec.dt_default = file.dt;
    Ok(spec)
}

/// `<data_root>/<system>/case_<case_id>/ds_<dataset_id>` with the first
/// existing extension out of [`DATA_EXTENSIONS`].
pub fn resolve_data_path(
    data_root: &Path,
    system: &str,
    case_id: &str,
    dataset_id: &str,
) -> BenchResult<PathBuf> {
    let base = data_root
        .join(system)
        .join(format!("case_{}", case_id))
        .join(format!("ds_{}", dataset_id));

    for ext in DATA_EXTENSIONS {
        let mut candidate = base.clone().into_os_string();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(BenchError::DatasetNotFound(base))
}
