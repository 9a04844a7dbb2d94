//! The model-fitting capability the harness drives.
//!
//! The harness only sees [`EstimatorFactory`] and [`Estimator`]; the built-in
//! backend is [`SindyFactory`], configured through three closed strategy
//! enums read from the run configuration.

mod differentiation;
mod library;
mod optimizer;
mod settings;
mod sindy;

pub use differentiation::Differentiation;
pub use library::FeatureLibrary;
pub use optimizer::Optimizer;
pub use settings::ModelSettings;
pub use sindy::{Sindy, SindyFactory};

use crate::config::ConfigMap;
use crate::errors::BenchResult;
use ndarray::{Array2, ArrayView2};

/// A model that can be fit once and then queried for its coefficients.
pub trait Estimator {
    fn fit(&mut self, x: ArrayView2<'_, f64>, dt: f64) -> BenchResult<()>;

    /// Fails with `CoefficientsUnavailable` when the model has nothing to report.
    fn coefficients(&self) -> BenchResult<Array2<f64>>;

    /// Readable form of the fitted model, one line per target.
    fn equations(&self, _n_features: usize) -> BenchResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Builds a fresh, unfitted [`Estimator`] from the run configuration.
pub trait EstimatorFactory {
    type Estimator: Estimator;

    fn build(&self, config: &ConfigMap) -> BenchResult<Self::Estimator>;
}
