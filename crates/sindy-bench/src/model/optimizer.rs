use crate::errors::{BenchError, BenchResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Optimizer {
    /// Sequentially thresholded ridge least squares.
    Stlsq {
        threshold: f64,
        alpha: f64,
        max_iter: usize,
    },
}

impl Optimizer {
    /// Solve `theta * xi^T ~= dxdt` for a sparse `xi` of shape `(n_targets, n_terms)`.
    pub fn solve(&self, theta: ArrayView2<'_, f64>, dxdt: ArrayView2<'_, f64>) -> BenchResult<Array2<f64>> {
        let Optimizer::Stlsq {
            threshold,
            alpha,
            max_iter,
        } = *self;

        if theta.nrows() != dxdt.nrows() {
            return Err(BenchError::ModelError(format!(
                "library has {} rows but derivatives have {}",
                theta.nrows(),
                dxdt.nrows()
            )));
        }

        let n_terms = theta.ncols();
        let mut coef = Array2::zeros((dxdt.ncols(), n_terms));

        for (target, y) in dxdt.axis_iter(Axis(1)).enumerate() {
            let mut support: Vec<usize> = (0..n_terms).collect();
            for _ in 0..max_iter {
                if support.is_empty() {
                    break;
                }
                let w = ridge(theta, &support, y, alpha)?;
                let kept: Vec<usize> = support
                    .iter()
                    .zip(w.iter())
                    .filter(|(_, c)| c.abs() >= threshold)
                    .map(|(&i, _)| i)
                    .collect();
                if kept.len() == support.len() {
                    break;
                }
                support = kept;
            }

            if !support.is_empty() {
                let w = ridge(theta, &support, y, alpha)?;
                for (k, &i) in support.iter().enumerate() {
                    coef[[target, i]] = w[k];
                }
            }
        }
        Ok(coef)
    }
}

fn ridge(
    theta: ArrayView2<'_, f64>,
    support: &[usize],
    y: ArrayView1<'_, f64>,
    alpha: f64,
) -> BenchResult<Array1<f64>> {
    let sub = theta.select(Axis(1), support);
    let mut gram = sub.t().dot(&sub);
    for i in 0..support.len() {
        gram[[i, i]] += alpha;
    }
    let rhs = sub.t().dot(&y);
    cholesky_solve(gram, rhs)
        .ok_or_else(|| BenchError::ModelError("normal equations are singular".to_string()))
}

/// Solve `a x = b` for symmetric positive definite `a`.
fn cholesky_solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    // In-place lower factor.
    for j in 0..n {
        let mut d = a[[j, j]];
        for k in 0..j {
            d -= a[[j, k]] * a[[j, k]];
        }
        if !(d > 1e-12) {
            return None;
        }
        let d = d.sqrt();
        a[[j, j]] = d;
        for i in j + 1..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= a[[i, k]] * a[[j, k]];
            }
            a[[i, j]] = s / d;
        }
    }
    for i in 0..n {
        let mut s = b[i];
        for k in 0..i {
            s -= a[[i, k]] * b[k];
        }
        b[i] = s / a[[i, i]];
    }
    for i in (0..n).rev() {
        let mut s = b[i];
        for k in i + 1..n {
            s -= a[[k, i]] * b[k];
        }
        b[i] = s / a[[i, i]];
    }
    Some(b)
}
