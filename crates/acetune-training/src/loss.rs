//! Cross-entropy between match outcomes and a logistic win-probability model.
//!
//! A score `s` maps to a win probability `p = sigmoid(c·s)`. The per-sample loss is the binary
//! cross-entropy `-(y·ln p + (1-y)·ln(1-p))` against the outcome label `y`, and its derivative
//! with respect to the score is `-c·(y - p)`. Gradients with respect to the parameters follow
//! by the chain rule through the per-sample score Jacobian.
//!
//! Both log-probabilities are evaluated with `ln_1p` on a branch chosen by the sign of `c·s`,
//! so `exp` is only ever called on non-positive arguments and nothing overflows for large
//! scores.

/// Per-sample derivatives of the score with respect to each tunable parameter.
///
/// Stored row-major: one row per sample, one column per parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian {
    samples: usize,
    params: usize,
    data: Vec<f64>,
}

impl Jacobian {
    #[must_use]
    pub fn zeros(samples: usize, params: usize) -> Self {
        Self {
            samples,
            params,
            data: vec![0.0; samples * params],
        }
    }

    /// Builds a Jacobian from per-sample rows.
    pub fn from_rows<R>(rows: &[R]) -> Result<Self, LossError>
    where
        R: AsRef<[f64]>,
    {
        let params = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * params);
        for row in rows {
            let row = row.as_ref();
            if row.len() != params {
                return Err(LossError::ShapeMismatch {
                    what: "jacobian row",
                    expected: params,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            samples: rows.len(),
            params,
            data,
        })
    }

    #[must_use]
    pub fn samples(&self) -> usize {
        self.samples
    }

    #[must_use]
    pub fn params(&self) -> usize {
        self.params
    }

    #[must_use]
    pub fn row(&self, sample: usize) -> &[f64] {
        &self.data[sample * self.params..(sample + 1) * self.params]
    }

    pub fn set(&mut self, sample: usize, param: usize, value: f64) {
        self.data[sample * self.params + param] = value;
    }

    /// Multiplies every entry by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum LossError {
    #[display("shape mismatch: {what} has length {actual}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("cannot compute the loss of an empty batch")]
    EmptyBatch,
}

/// `ln(sigmoid(x))`
#[must_use]
pub fn log_sigmoid(x: f64) -> f64 {
    if x > 0.0 {
        -(-x).exp().ln_1p()
    } else {
        x - x.exp().ln_1p()
    }
}

/// `ln(1 - sigmoid(x))`
#[must_use]
pub fn log_one_minus_sigmoid(x: f64) -> f64 {
    if x > 0.0 {
        -x - (-x).exp().ln_1p()
    } else {
        -x.exp().ln_1p()
    }
}

#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    if x > 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Mean cross-entropy of `labels` against `sigmoid(scale · scores)`, and its gradient with
/// respect to the parameters whose score derivatives are given by `jacobian`.
///
/// Returns `(mean_loss, gradient)` where `gradient` has one entry per Jacobian column.
#[expect(clippy::cast_precision_loss)]
pub fn cross_entropy(
    scores: &[f64],
    jacobian: &Jacobian,
    labels: &[f64],
    scale: f64,
) -> Result<(f64, Vec<f64>), LossError> {
    if labels.len() != scores.len() {
        return Err(LossError::ShapeMismatch {
            what: "labels",
            expected: scores.len(),
            actual: labels.len(),
        });
    }
    if jacobian.samples() != scores.len() {
        return Err(LossError::ShapeMismatch {
            what: "jacobian",
            expected: scores.len(),
            actual: jacobian.samples(),
        });
    }
    if scores.is_empty() {
        return Err(LossError::EmptyBatch);
    }

    let n = scores.len() as f64;
    let mut loss = 0.0;
    let mut gradient = vec![0.0; jacobian.params()];
    for (i, (&s, &y)) in scores.iter().zip(labels).enumerate() {
        let x = scale * s;
        loss -= y * log_sigmoid(x) + (1.0 - y) * log_one_minus_sigmoid(x);

        let dloss_dscore = -scale * (y - sigmoid(x));
        for (g, ds) in gradient.iter_mut().zip(jacobian.row(i)) {
            *g += dloss_dscore * ds;
        }
    }
    for g in &mut gradient {
        *g /= n;
    }
    Ok((loss / n, gradient))
}
