use crate::errors::{BenchError, BenchResult};
use ndarray::{Array2, ArrayView2, Axis};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Differentiation {
    FiniteDifference,
    /// Centered moving average of half-width `round(alpha)` samples, then
    /// finite differences. `alpha <= 0` disables the smoothing.
    SmoothedFiniteDifference { alpha: f64 },
}

impl Differentiation {
    /// Time derivative of every column of `x`, sampled every `dt`.
    pub fn differentiate(&self, x: ArrayView2<'_, f64>, dt: f64) -> BenchResult<Array2<f64>> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(BenchError::ModelError(format!(
                "time step must be positive, got {}",
                dt
            )));
        }
        if x.nrows() < 2 {
            return Err(BenchError::ModelError(format!(
                "need at least 2 samples to differentiate, got {}",
                x.nrows()
            )));
        }

        match *self {
            Differentiation::FiniteDifference => Ok(finite_difference(x, dt)),
            Differentiation::SmoothedFiniteDifference { alpha } => {
                let half_width = if alpha > 0.0 { alpha.round() as usize } else { 0 };
                let smoothed = moving_average(x, half_width);
                Ok(finite_difference(smoothed.view(), dt))
            }
        }
    }
}

// Second-order central differences inside, second-order one-sided at the
// ends (first-order when only two samples exist).
fn finite_difference(x: ArrayView2<'_, f64>, dt: f64) -> Array2<f64> {
    let n = x.nrows();
    let mut out = Array2::zeros(x.raw_dim());

    for (col_in, mut col_out) in x.axis_iter(Axis(1)).zip(out.axis_iter_mut(Axis(1))) {
        if n == 2 {
            let d = (col_in[1] - col_in[0]) / dt;
            col_out.fill(d);
            continue;
        }
        for i in 1..n - 1 {
            col_out[i] = (col_in[i + 1] - col_in[i - 1]) / (2.0 * dt);
        }
        col_out[0] = (-3.0 * col_in[0] + 4.0 * col_in[1] - col_in[2]) / (2.0 * dt);
        col_out[n - 1] = (3.0 * col_in[n - 1] - 4.0 * col_in[n - 2] + col_in[n - 3]) / (2.0 * dt);
    }
    out
}

fn moving_average(x: ArrayView2<'_, f64>, half_width: usize) -> Array2<f64> {
    if half_width == 0 {
        return x.to_owned();
    }
    let n = x.nrows();
    let mut out = Array2::zeros(x.raw_dim());
    for i in 0..n {
        let lo = i.saturating_sub(half_width);
        let hi = (i + half_width + 1).min(n);
        let window = x.slice(ndarray::s![lo..hi, ..]);
        if let Some(mean) = window.mean_axis(Axis(0)) {
            out.row_mut(i).assign(&mean);
        }
    }
    out
}
