pub mod config;
pub mod dataset;
pub mod environment;
pub mod errors;
pub mod model;
pub mod reporting;
pub mod runners;
pub mod system;

// Re-export main components for easier use
pub use config::{deep_merge, load_yaml, parse_simple_yaml, ConfigMap};
pub use dataset::{load_dataset, validate_dataset};
pub use environment::RunIdentity;
pub use errors::{BenchError, BenchResult};
pub use model::{Estimator, EstimatorFactory, SindyFactory};
pub use reporting::RunRecord;
pub use runners::harness::{Harness, RunOutcome, RunReport, RunRequest};
pub use system::{load_system_spec, resolve_data_path, SystemSpec};
