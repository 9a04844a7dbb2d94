use ndarray::Array2;
use ndarray_npy::read_npy;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{tempdir, TempDir};

/// A data root with one system, `decay`, holding case `a` / dataset `1`.
fn decay_fixture(system_yaml: &str) -> TempDir {
    let dir = tempdir().unwrap();
    let system_dir = dir.path().join("systems").join("decay");
    fs::create_dir_all(system_dir.join("case_a")).unwrap();
    fs::create_dir_all(system_dir.join("configs")).unwrap();
    fs::write(system_dir.join("system.yaml"), system_yaml).unwrap();
    fs::write(
        system_dir.join("configs").join("sindy.yaml"),
        "library:\n  degree: 2\noptimizer:\n  threshold: 0.05\n",
    )
    .unwrap();

    let mut csv = String::from("x,y\n");
    for i in 0..400 {
        let t = i as f64 * 0.01;
        csv.push_str(&format!("{},{}\n", (-t).exp(), 2.0 * (-0.3 * t).exp()));
    }
    fs::write(system_dir.join("case_a").join("ds_1.csv"), csv).unwrap();
    dir
}

fn run(root: &Path, extra: &[&str]) -> (Output, PathBuf, PathBuf) {
    let out = root.join("results").join("run.jsonl");
    let coef = root.join("results").join("coef");
    let output = Command::new(env!("CARGO_BIN_EXE_sindy-bench"))
        .arg("--method")
        .arg("sindy")
        .arg("--system")
        .arg("decay")
        .arg("--case")
        .arg("a")
        .arg("--dataset")
        .arg("1")
        .arg("--data-root")
        .arg(root.join("systems"))
        .arg("--out")
        .arg(&out)
        .arg("--coef-out")
        .arg(&coef)
        .args(extra)
        .env("RUN_ID", "cli-test")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    (output, out, coef)
}

fn read_record(path: &Path) -> Value {
    let content = fs::read_to_string(path).unwrap();
    assert_eq!(content.lines().count(), 1);
    serde_json::from_str(content.trim_end()).unwrap()
}

#[test]
fn successful_run_writes_record_and_coefficients() {
    let dir = decay_fixture("has_header: true\ndims: 2\ndt: 0.01\n");
    let (output, out, coef) = run(dir.path(), &["--rep", "3", "--warmup", "1"]);

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let record = read_record(&out);
    assert_eq!(record["ok"], Value::Bool(true));
    assert_eq!(record["run_id"], "cli-test");
    assert_eq!(record["method"], "sindy");
    assert_eq!(record["X_shape"], serde_json::json!([400, 2]));
    assert_eq!(record["t_fit_ns"].as_array().unwrap().len(), 3);
    assert_eq!(record["t_init_ns"].as_array().unwrap().len(), 3);
    assert_eq!(record["cfg"]["library"]["degree"], 2);
    assert_eq!(record["cfg"]["dt"], 0.01);

    // degree 2 over two features without bias: x, y, x^2, x y, y^2
    let coef: Array2<f64> = read_npy(coef.with_extension("npy")).unwrap();
    assert_eq!(coef.dim(), (2, 5));
    assert_eq!(record["coef_shape"], serde_json::json!([2, 5]));
    assert!(coef.iter().all(|c| c.is_finite()));
    let l1: f64 = coef.iter().map(|c| c.abs()).sum();
    assert!((record["coef_l1"].as_f64().unwrap() - l1).abs() < 1e-9);
}

#[test]
fn unknown_library_exits_with_failure_code() {
    let dir = decay_fixture("has_header: true\ndt: 0.01\n");
    let (output, out, coef) = run(
        dir.path(),
        &["--config-override-json", r#"{"library": {"type": "fourier"}}"#],
    );

    assert_eq!(output.status.code(), Some(2));
    let record = read_record(&out);
    assert_eq!(record["ok"], Value::Bool(false));
    assert_eq!(record["error_type"], "ConfigError");
    assert!(record["error_msg"].as_str().unwrap().contains("fourier"));
    assert!(record["traceback"].as_str().unwrap().contains("TIMED_REP"));
    assert!(!coef.with_extension("npy").exists());
}

#[test]
fn missing_dt_is_reported_before_loading_data() {
    let dir = decay_fixture("has_header: true\n");
    let (output, out, _) = run(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(2));
    let record = read_record(&out);
    assert_eq!(record["error_type"], "ConfigError");
    assert_eq!(record["data_path"], Value::Null);
}

#[test]
fn dt_flag_satisfies_missing_system_dt() {
    let dir = decay_fixture("has_header: true\n");
    let (output, out, _) = run(dir.path(), &["--dt", "0.01"]);

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(read_record(&out)["dt_used"], 0.01);
}

#[test]
fn unwritable_record_exits_with_one() {
    let dir = decay_fixture("has_header: true\ndt: 0.01\n");
    // A directory where the record file should go.
    fs::create_dir_all(dir.path().join("results").join("run.jsonl")).unwrap();
    let (output, _, _) = run(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to write run record"));
}
