use crate::config::ConfigMap;
use crate::errors::{BenchError, BenchResult};
use crate::model::{Estimator, EstimatorFactory, ModelSettings};
use ndarray::{Array2, ArrayView2};

const EQUATION_PRECISION: usize = 3;

/// Sparse identification of nonlinear dynamics: differentiate the samples,
/// build a candidate feature library and regress the derivatives onto it.
#[derive(Debug, Clone)]
pub struct Sindy {
    settings: ModelSettings,
    coefficients: Option<Array2<f64>>,
}

impl Sindy {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            coefficients: None,
        }
    }
}

impl Estimator for Sindy {
    fn fit(&mut self, x: ArrayView2<'_, f64>, dt: f64) -> BenchResult<()> {
        let dxdt = self.settings.differentiation.differentiate(x, dt)?;
        let theta = self.settings.library.transform(x);
        if theta.ncols() == 0 {
            return Err(BenchError::ModelError(
                "feature library produced no terms".to_string(),
            ));
        }
        let coef = self.settings.optimizer.solve(theta.view(), dxdt.view())?;
        self.coefficients = Some(coef);
        Ok(())
    }

    fn coefficients(&self) -> BenchResult<Array2<f64>> {
        self.coefficients.clone().ok_or_else(|| {
            BenchError::CoefficientsUnavailable("model has not been fit".to_string())
        })
    }

    /// `(x0)' = -10.000 x0 + 10.000 x1` style.
    fn equations(&self, n_features: usize) -> BenchResult<Vec<String>> {
        let coef = self.coefficients()?;
        let names = self.settings.library.feature_names(n_features);
        Ok(coef
            .outer_iter()
            .enumerate()
            .map(|(target, row)| {
                let terms: Vec<String> = row
                    .iter()
                    .zip(names.iter())
                    .filter(|(c, _)| **c != 0.0)
                    .map(|(c, name)| format!("{:.*} {}", EQUATION_PRECISION, c, name))
                    .collect();
                let rhs = if terms.is_empty() {
                    "0".to_string()
                } else {
                    terms.join(" + ")
                };
                format!("(x{})' = {}", target, rhs)
            })
            .collect())
    }
}

/// Builds [`Sindy`] models from the `differentiation`, `library` and
/// `optimizer` sections of the run configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SindyFactory;

impl EstimatorFactory for SindyFactory {
    type Estimator = Sindy;

    fn build(&self, config: &ConfigMap) -> BenchResult<Sindy> {
        Ok(Sindy::new(ModelSettings::from_config(config)?))
    }
}
