use crate::config::{method_config_path, resolve_run_config, ConfigMap, DT_KEY};
use crate::dataset::{load_dataset, validate_dataset};
use crate::environment::RunIdentity;
use crate::errors::{BenchError, BenchResult};
use crate::model::{Estimator, EstimatorFactory};
use crate::reporting::{ensure_parent, RecordWriter, RunRecord};
use crate::system::{load_system_spec, resolve_data_path};
use ndarray::{Array2, ArrayView2};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Everything one invocation needs to know.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub method: String,
    pub system: String,
    pub case_id: String,
    pub dataset_id: String,
    pub data_root: PathBuf,
    pub out: PathBuf,
    pub coef_out: PathBuf,
    pub rep: usize,
    pub warmup: usize,
    pub dt: Option<f64>,
    pub config_override_json: String,
}

impl RunRequest {
    pub fn system_dir(&self) -> PathBuf {
        self.data_root.join(&self.system)
    }

    pub fn method_cfg_path(&self) -> PathBuf {
        method_config_path(&self.system_dir(), &self.method)
    }
}

/// Where a run was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Configuring,
    LoadingData,
    Warmup,
    TimedRep,
    Finalizing,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Configuring => "CONFIGURING",
            RunState::LoadingData => "LOADING_DATA",
            RunState::Warmup => "WARMUP",
            RunState::TimedRep => "TIMED_REP",
            RunState::Finalizing => "FINALIZING",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Succeeded => 0,
            RunOutcome::Failed => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub record: RunRecord,
}

/// Drives one configured, timed benchmark run against an estimator backend.
///
/// A run always ends with exactly one record written to `request.out`.
/// Failures inside the run (including panics in the backend) are captured in
/// that record; only a failure to write the record itself is returned as an
/// error.
pub struct Harness<F> {
    factory: F,
}

impl<F: EstimatorFactory> Harness<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    pub fn run(&self, request: &RunRequest, identity: RunIdentity) -> BenchResult<RunReport> {
        let mut record = RunRecord::new(identity);
        record.method = request.method.clone();
        record.system = request.system.clone();
        record.case_id = request.case_id.clone();
        record.dataset_id = request.dataset_id.clone();
        record.method_cfg_path = request.method_cfg_path().display().to_string();
        record.rep = request.rep;
        record.warmup = request.warmup;

        let mut writer = RecordWriter::new(&request.out, record);
        let mut state = RunState::Configuring;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(request, writer.record_mut(), &mut state)
        }))
        .unwrap_or_else(|payload| Err(BenchError::ModelPanic(panic_message(payload))));

        let outcome = match result {
            Ok(()) => {
                writer.record_mut().mark_succeeded();
                tracing::info!(
                    "run succeeded: {} reps, t_fit_ns={:?}",
                    request.rep,
                    writer.record().t_fit_ns
                );
                RunOutcome::Succeeded
            }
            Err(e) => {
                tracing::error!("run failed during {}: {}", state, e);
                writer.record_mut().mark_failed(&e, state.as_str());
                RunOutcome::Failed
            }
        };

        let record = writer.finish()?;
        Ok(RunReport { outcome, record })
    }

    fn execute(
        &self,
        request: &RunRequest,
        record: &mut RunRecord,
        state: &mut RunState,
    ) -> BenchResult<()> {
        *state = RunState::Configuring;
        tracing::info!(
            "configuring {} on {} (case {}, dataset {})",
            request.method,
            request.system,
            request.case_id,
            request.dataset_id
        );
        let system_dir = request.system_dir();
        let spec = load_system_spec(&system_dir)?;
        let mut cfg = resolve_run_config(&request.method_cfg_path(), &request.config_override_json)?;
        record.cfg = cfg.clone();

        let dt = request
            .dt
            .or(spec.dt_default)
            .ok_or(BenchError::MissingTimeStep)?;
        cfg.insert(DT_KEY.to_string(), Value::from(dt));
        record.cfg.insert(DT_KEY.to_string(), Value::from(dt));
        record.dt_used = Some(dt);

        *state = RunState::LoadingData;
        let data_path = resolve_data_path(
            &request.data_root,
            &request.system,
            &request.case_id,
            &request.dataset_id,
        )?;
        record.data_path = Some(data_path.display().to_string());
        tracing::info!("loading dataset {}", data_path.display());
        let x = load_dataset(&data_path, &spec)?;
        validate_dataset(&x, &spec)?;
        record.x_shape = Some(vec![x.nrows(), x.ncols()]);

        *state = RunState::Warmup;
        for i in 0..request.warmup {
            tracing::debug!("warmup {}/{}", i + 1, request.warmup);
            self.cycle(&cfg, x.view(), dt)?;
        }

        *state = RunState::TimedRep;
        let mut last = None;
        for i in 0..request.rep {
            let started = Instant::now();
            let mut model = self.factory.build(&cfg)?;
            let t_init = started.elapsed();

            let started = Instant::now();
            model.fit(x.view(), dt)?;
            let coef = model.coefficients()?;
            let t_fit = started.elapsed();

            record.t_init_ns.push(nanos(t_init));
            record.t_fit_ns.push(nanos(t_fit));
            tracing::debug!(
                "rep {}/{}: init {:?}, fit {:?}",
                i + 1,
                request.rep,
                t_init,
                t_fit
            );
            last = Some((model, coef));
        }

        *state = RunState::Finalizing;
        let (model, coef) = last.ok_or_else(|| {
            BenchError::CoefficientsUnavailable("no timed repetitions were run".to_string())
        })?;
        match model.equations(x.ncols()) {
            Ok(equations) => {
                for eq in equations {
                    tracing::debug!("{}", eq);
                }
            }
            Err(e) => tracing::debug!("model has no equations to show: {}", e),
        }
        let coef_path = npy_path(&request.coef_out);
        record.coef_shape = Some(coef.shape().to_vec());
        record.coef_l1 = Some(coef.iter().map(|c| c.abs()).sum());
        record.coef_l2 = Some(coef.iter().map(|c| c * c).sum::<f64>().sqrt());
        write_coefficients(&coef_path, &coef)?;
        record.coef_path = Some(coef_path.display().to_string());
        Ok(())
    }

    fn cycle(&self, cfg: &ConfigMap, x: ArrayView2<'_, f64>, dt: f64) -> BenchResult<()> {
        let mut model = self.factory.build(cfg)?;
        model.fit(x, dt)?;
        model.coefficients()?;
        Ok(())
    }
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// `path` with `.npy` appended unless it already ends in it.
pub fn npy_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "npy") {
        return path.to_path_buf();
    }
    let mut s = path.as_os_str().to_owned();
    s.push(".npy");
    PathBuf::from(s)
}

fn write_coefficients(path: &Path, coef: &Array2<f64>) -> BenchResult<()> {
    ensure_parent(path)?;
    ndarray_npy::write_npy(path, coef).map_err(|e| BenchError::ArtifactError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    tracing::info!("wrote coefficients {:?} to {}", coef.shape(), path.display());
    Ok(())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SindyFactory;
    use ndarray_npy::read_npy;
    use std::cell::Cell;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    /// Each built model reports coefficients equal to its build number.
    #[derive(Default)]
    struct CountingFactory {
        builds: Cell<usize>,
        fits: Cell<usize>,
        described: Cell<usize>,
    }

    struct Counted<'a> {
        id: usize,
        factory: &'a CountingFactory,
        fitted: bool,
    }

    impl<'f> EstimatorFactory for &'f CountingFactory {
        type Estimator = Counted<'f>;

        fn build(&self, _config: &ConfigMap) -> BenchResult<Counted<'f>> {
            let factory: &'f CountingFactory = self;
            factory.builds.set(factory.builds.get() + 1);
            Ok(Counted {
                id: factory.builds.get(),
                factory,
                fitted: false,
            })
        }
    }

    impl Estimator for Counted<'_> {
        fn fit(&mut self, _x: ArrayView2<'_, f64>, _dt: f64) -> BenchResult<()> {
            self.factory.fits.set(self.factory.fits.get() + 1);
            self.fitted = true;
            Ok(())
        }

        fn coefficients(&self) -> BenchResult<Array2<f64>> {
            if !self.fitted {
                return Err(BenchError::CoefficientsUnavailable("not fit".to_string()));
            }
            Ok(Array2::from_elem((2, 3), self.id as f64))
        }

        fn equations(&self, n_features: usize) -> BenchResult<Vec<String>> {
            self.factory.described.set(self.factory.described.get() + 1);
            Ok(vec![format!("model {} over {} features", self.id, n_features)])
        }
    }

    struct PanickingFactory;

    impl EstimatorFactory for PanickingFactory {
        type Estimator = Counted<'static>;

        fn build(&self, _config: &ConfigMap) -> BenchResult<Counted<'static>> {
            panic!("solver exploded");
        }
    }

    fn fixture(system_yaml: &str) -> (TempDir, RunRequest) {
        let dir = tempdir().unwrap();
        let system_dir = dir.path().join("data").join("toy");
        fs::create_dir_all(system_dir.join("case_a")).unwrap();
        fs::write(system_dir.join("system.yaml"), system_yaml).unwrap();
        fs::write(
            system_dir.join("case_a").join("ds_1.csv"),
            "1,2\n3,4\n5,6\n7,8\n",
        )
        .unwrap();

        let request = RunRequest {
            method: "sindy".to_string(),
            system: "toy".to_string(),
            case_id: "a".to_string(),
            dataset_id: "1".to_string(),
            data_root: dir.path().join("data"),
            out: dir.path().join("out").join("run.jsonl"),
            coef_out: dir.path().join("out").join("coef"),
            rep: 1,
            warmup: 0,
            dt: None,
            config_override_json: String::new(),
        };
        (dir, request)
    }

    fn on_disk(request: &RunRequest) -> RunRecord {
        let content = fs::read_to_string(&request.out).unwrap();
        assert_eq!(content.lines().count(), 1);
        serde_json::from_str(content.trim_end()).unwrap()
    }

    #[test]
    fn warmups_are_untimed_and_last_rep_is_persisted() {
        let (_dir, mut request) = fixture("dt: 0.01\ndims: 2\n");
        request.warmup = 2;
        request.rep = 3;
        let factory = CountingFactory::default();

        let report = Harness::new(&factory).run(&request, RunIdentity::capture()).unwrap();

        assert_eq!(report.outcome, RunOutcome::Succeeded);
        assert_eq!(report.outcome.exit_code(), 0);
        assert_eq!(factory.builds.get(), 5);
        assert_eq!(factory.fits.get(), 5);
        // only the persisted model is rendered
        assert_eq!(factory.described.get(), 1);

        let record = on_disk(&request);
        assert!(record.ok);
        assert_eq!(record.run_id, report.record.run_id);
        assert_eq!(record.t_init_ns.len(), 3);
        assert_eq!(record.t_fit_ns.len(), 3);
        assert_eq!(record.x_shape, Some(vec![4, 2]));
        assert_eq!(record.dt_used, Some(0.01));
        assert_eq!(record.cfg.get("dt"), Some(&Value::from(0.01)));
        assert_eq!(record.coef_shape, Some(vec![2, 3]));
        assert_eq!(record.coef_l1, Some(30.0));
        assert!((record.coef_l2.unwrap() - 150f64.sqrt()).abs() < 1e-12);

        let coef_path = request.coef_out.with_extension("npy");
        assert_eq!(record.coef_path, Some(coef_path.display().to_string()));
        let coef: Array2<f64> = read_npy(&coef_path).unwrap();
        assert!(coef.iter().all(|&c| c == 5.0));
    }

    #[test]
    fn cli_dt_overrides_system_default() {
        let (_dir, mut request) = fixture("dt: 0.01\n");
        request.dt = Some(0.5);
        let factory = CountingFactory::default();
        let report = Harness::new(&factory).run(&request, RunIdentity::capture()).unwrap();
        assert_eq!(report.record.dt_used, Some(0.5));
    }

    #[test]
    fn missing_dt_fails_before_loading_data() {
        let (_dir, request) = fixture("dims: 2\n");
        let factory = CountingFactory::default();

        let report = Harness::new(&factory).run(&request, RunIdentity::capture()).unwrap();

        assert_eq!(report.outcome, RunOutcome::Failed);
        assert_eq!(report.outcome.exit_code(), 2);
        let record = on_disk(&request);
        assert!(!record.ok);
        assert_eq!(record.error_type.as_deref(), Some("ConfigError"));
        assert!(record.error_msg.unwrap().contains("dt is required"));
        assert!(record.traceback.unwrap().contains("CONFIGURING"));
        assert_eq!(record.data_path, None);
        assert_eq!(record.x_shape, None);
        assert_eq!(factory.builds.get(), 0);
    }

    #[test]
    fn unknown_library_is_captured_as_config_error() {
        let (_dir, mut request) = fixture("dt: 0.1\n");
        request.config_override_json = r#"{"library": {"type": "fourier"}}"#.to_string();

        let report = Harness::new(SindyFactory)
            .run(&request, RunIdentity::capture())
            .unwrap();

        assert_eq!(report.outcome.exit_code(), 2);
        let record = on_disk(&request);
        assert_eq!(record.error_type.as_deref(), Some("ConfigError"));
        assert!(record.error_msg.unwrap().contains("fourier"));
        assert!(record.t_fit_ns.is_empty());
        assert_eq!(record.x_shape, Some(vec![4, 2]));
        assert!(!request.coef_out.with_extension("npy").exists());
    }

    #[test]
    fn dims_mismatch_is_a_data_error() {
        let (_dir, request) = fixture("dt: 0.1\ndims: 3\n");
        let factory = CountingFactory::default();
        let report = Harness::new(&factory).run(&request, RunIdentity::capture()).unwrap();

        let msg = report.record.error_msg.unwrap();
        assert_eq!(report.record.error_type.as_deref(), Some("DataError"));
        assert!(msg.contains('3') && msg.contains('4'), "{}", msg);
        assert!(report.record.data_path.is_some());
    }

    #[test]
    fn zero_reps_has_no_coefficients() {
        let (_dir, mut request) = fixture("dt: 0.1\n");
        request.rep = 0;
        let factory = CountingFactory::default();
        let report = Harness::new(&factory).run(&request, RunIdentity::capture()).unwrap();

        assert_eq!(report.outcome, RunOutcome::Failed);
        assert_eq!(report.record.error_type.as_deref(), Some("CoefficientError"));
        assert!(report.record.t_init_ns.is_empty());
        assert!(report.record.traceback.unwrap().contains("FINALIZING"));
    }

    #[test]
    fn backend_panic_is_recorded() {
        let (_dir, request) = fixture("dt: 0.1\n");
        let report = Harness::new(PanickingFactory)
            .run(&request, RunIdentity::capture())
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Failed);
        let record = on_disk(&request);
        assert_eq!(record.error_type.as_deref(), Some("ModelError"));
        assert!(record.error_msg.unwrap().contains("solver exploded"));
    }

    #[test]
    fn npy_extension_is_appended_once() {
        assert_eq!(npy_path(Path::new("out/coef")), PathBuf::from("out/coef.npy"));
        assert_eq!(npy_path(Path::new("out/coef.npy")), PathBuf::from("out/coef.npy"));
        assert_eq!(npy_path(Path::new("out/c.v1")), PathBuf::from("out/c.v1.npy"));
    }
}
