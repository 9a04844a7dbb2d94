use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::env;
use std::process::Command;

pub const RUN_ID_VAR: &str = "RUN_ID";
pub const ENV_NAME_VAR: &str = "BENCH_ENV";
const ENV_NAME_FALLBACK_VAR: &str = "CONDA_DEFAULT_ENV";
const HOST_VAR: &str = "HOSTNAME";

/// Identity fields sampled once when a run record is created.
#[derive(Debug, Clone, PartialEq)]
pub struct RunIdentity {
    pub run_id: String,
    pub env: String,
    pub host: String,
    pub pid: u32,
    pub timestamp_utc: String,
    pub runtime: Option<String>,
    pub deps: BTreeMap<String, String>,
}

impl RunIdentity {
    pub fn capture() -> Self {
        Self {
            run_id: env::var(RUN_ID_VAR).unwrap_or_default(),
            env: env::var(ENV_NAME_VAR)
                .or_else(|_| env::var(ENV_NAME_FALLBACK_VAR))
                .unwrap_or_default(),
            host: host_name(),
            pid: std::process::id(),
            timestamp_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            runtime: option_env!("CARGO_PKG_RUST_VERSION")
                .filter(|v| !v.is_empty())
                .map(|v| format!("rust {}", v)),
            deps: dependency_versions(),
        }
    }
}

fn host_name() -> String {
    env::var(HOST_VAR)
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            Command::new("hostname")
                .output()
                .ok()
                .filter(|o| o.status.success())
                .and_then(|o| String::from_utf8(o.stdout).ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Numeric stack versions; keep in step with the `[dependencies]` table.
pub const NDARRAY_VERSION: &str = "0.16";
pub const NDARRAY_NPY_VERSION: &str = "0.9";

// Anything unavailable at build time is left out.
fn dependency_versions() -> BTreeMap<String, String> {
    [
        (option_env!("CARGO_PKG_NAME"), option_env!("CARGO_PKG_VERSION")),
        (Some("ndarray"), Some(NDARRAY_VERSION)),
        (Some("ndarray-npy"), Some(NDARRAY_NPY_VERSION)),
    ]
    .into_iter()
    .filter_map(|(name, version)| Some((name?.to_string(), version?.to_string())))
    .collect()
}
