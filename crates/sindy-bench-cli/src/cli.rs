use clap::Parser;
use sindy_bench::RunRequest;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sindy-bench",
    author,
    version,
    about = "Run one timed model fit against a benchmark dataset and record it",
    long_about = None
)]
pub struct Cli {
    #[arg(long, value_name = "NAME", help = "Method name, selects configs/<NAME>.yaml")]
    pub method: String,

    #[arg(long, value_name = "SYSTEM", help = "System directory under the data root")]
    pub system: String,

    #[arg(
        long = "case",
        value_name = "ID",
        help = "Case id, resolves case_<ID>/ under the system"
    )]
    pub case_id: String,

    #[arg(
        long = "dataset",
        value_name = "ID",
        help = "Dataset id, resolves ds_<ID>.{npz,npy,csv} under the case"
    )]
    pub dataset_id: String,

    #[arg(long, value_name = "PATH", help = "Where to write the JSON-lines run record")]
    pub out: PathBuf,

    #[arg(
        long = "coef-out",
        alias = "coef_out",
        value_name = "PATH",
        help = "Where to write the coefficient matrix",
        long_help = "Where to write the coefficient matrix of the last repetition as .npy. The extension is appended when missing."
    )]
    pub coef_out: PathBuf,

    #[arg(
        long = "data-root",
        alias = "data_root",
        value_name = "DIR",
        default_value = "data/systems",
        help = "Root directory holding one directory per system"
    )]
    pub data_root: PathBuf,

    #[arg(long, default_value_t = 1, help = "Number of timed repetitions")]
    pub rep: usize,

    #[arg(long, default_value_t = 0, help = "Number of untimed warmup fits")]
    pub warmup: usize,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Sampling interval, overrides dt from system.yaml"
    )]
    pub dt: Option<f64>,

    #[arg(
        long = "config-override-json",
        alias = "config_override_json",
        value_name = "JSON",
        default_value = "",
        help = "JSON object deep-merged over the method config",
        long_help = "JSON object deep-merged over the built-in defaults and the method config file, e.g. '{\"optimizer\": {\"threshold\": 0.05}}'."
    )]
    pub config_override_json: String,

    #[arg(
        long = "log-level",
        alias = "log_level",
        value_name = "FILTER",
        help = "Log filter such as 'info' or 'sindy_bench=debug'; defaults to RUST_LOG"
    )]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn into_request(self) -> RunRequest {
        RunRequest {
            method: self.method,
            system: self.system,
            case_id: self.case_id,
            dataset_id: self.dataset_id,
            data_root: self.data_root,
            out: self.out,
            coef_out: self.coef_out,
            rep: self.rep,
            warmup: self.warmup,
            dt: self.dt,
            config_override_json: self.config_override_json,
        }
    }
}
