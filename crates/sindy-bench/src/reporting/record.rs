use crate::config::ConfigMap;
use crate::environment::RunIdentity;
use crate::errors::{util::render_chain, BenchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One benchmark run, serialized as a single JSON line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub method: String,
    pub env: String,
    pub system: String,
    pub case_id: String,
    pub dataset_id: String,
    pub data_path: Option<String>,
    pub method_cfg_path: String,
    pub cfg: ConfigMap,

    pub rep: usize,
    pub warmup: usize,
    pub dt_used: Option<f64>,

    pub t_init_ns: Vec<u64>,
    pub t_fit_ns: Vec<u64>,
    pub ok: bool,
    pub error_type: Option<String>,
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,

    pub timestamp_utc: String,
    pub host: String,
    pub pid: u32,
    pub runtime: Option<String>,
    pub deps: BTreeMap<String, String>,

    #[serde(rename = "X_shape", default, skip_serializing_if = "Option::is_none")]
    pub x_shape: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coef_shape: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coef_l1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coef_l2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coef_path: Option<String>,
}

impl RunRecord {
    /// A fresh record carrying the run identity and empty outcome fields.
    pub fn new(identity: RunIdentity) -> Self {
        Self {
            run_id: identity.run_id,
            env: identity.env,
            timestamp_utc: identity.timestamp_utc,
            host: identity.host,
            pid: identity.pid,
            runtime: identity.runtime,
            deps: identity.deps,
            ..Default::default()
        }
    }

    pub fn mark_succeeded(&mut self) {
        self.ok = true;
        self.error_type = None;
        self.error_msg = None;
        self.traceback = None;
    }

    /// Record a failure; `stage` names where it happened.
    pub fn mark_failed(&mut self, err: &BenchError, stage: &str) {
        self.ok = false;
        self.error_type = Some(err.kind().to_string());
        self.error_msg = Some(err.to_string());
        self.traceback = Some(format!("{}\n\nduring: {}", render_chain(err), stage));
    }
}
