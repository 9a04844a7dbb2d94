use ndarray::{Array2, ArrayView2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureLibrary {
    Polynomial { degree: usize, include_bias: bool },
}

impl FeatureLibrary {
    /// Exponent combinations of each library term, as feature indices.
    ///
    /// Terms are ordered by total degree, then lexicographically, so for two
    /// features and degree 2: `1, x0, x1, x0^2, x0 x1, x1^2`.
    pub fn terms(&self, n_features: usize) -> Vec<Vec<usize>> {
        let FeatureLibrary::Polynomial {
            degree,
            include_bias,
        } = *self;

        let mut terms = Vec::new();
        if include_bias {
            terms.push(Vec::new());
        }
        for d in 1..=degree {
            let mut current = Vec::with_capacity(d);
            combinations(n_features, d, 0, &mut current, &mut terms);
        }
        terms
    }

    /// Evaluate every term on every sample: `(n_samples, n_terms)`.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let terms = self.terms(x.ncols());
        Array2::from_shape_fn((x.nrows(), terms.len()), |(i, j)| {
            terms[j].iter().map(|&f| x[[i, f]]).product()
        })
    }

    /// Human-readable names, `x0 x1^2` style.
    pub fn feature_names(&self, n_features: usize) -> Vec<String> {
        self.terms(n_features)
            .iter()
            .map(|term| {
                if term.is_empty() {
                    return "1".to_string();
                }
                let mut parts: Vec<String> = Vec::new();
                let mut i = 0;
                while i < term.len() {
                    let f = term[i];
                    let power = term[i..].iter().take_while(|&&g| g == f).count();
                    parts.push(match power {
                        1 => format!("x{}", f),
                        p => format!("x{}^{}", f, p),
                    });
                    i += power;
                }
                parts.join(" ")
            })
            .collect()
    }
}

// Non-decreasing index sequences of length `remaining + current.len()`.
fn combinations(
    n: usize,
    remaining: usize,
    start: usize,
    current: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if remaining == 0 {
        out.push(current.clone());
        return;
    }
    for f in start..n {
        current.push(f);
        combinations(n, remaining - 1, f, current, out);
        current.pop();
    }
}
