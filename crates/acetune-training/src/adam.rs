//! Adam with an L1 (sign) decay term.
//!
//! Each [`Adam::step`] turns a raw gradient into an update direction:
//!
//! ```text
//! m1     = β1·m1 + (1-β1)·g
//! m2     = β2·m2 + (1-β2)·g²
//! t     += 1
//! update = (m1 / (1-β1^t)) / (sqrt(m2 / (1-β2^t)) + ε) + λ1·sign(params)
//! ```
//!
//! The caller scales the update by the learning rate and subtracts it from the parameters;
//! the optimizer never touches the parameters itself.
//!
//! Moment estimates live only in memory. Restarting the tuner starts them from zero again even
//! when the parameters are resumed from a checkpoint.

/// Optimizer hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamParams {
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    /// Strength of the sign decay pulling parameters toward zero; `0.0` disables it.
    pub l1_decay: f64,
}

impl Default for AdamParams {
    fn default() -> Self {
        Self {
            beta1: 0.98,
            beta2: 0.999,
            eps: 1e-8,
            l1_decay: 0.0,
        }
    }
}

/// Per-parameter first and second moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    params: AdamParams,
    m1: Vec<f64>,
    m2: Vec<f64>,
    t: i32,
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl Adam {
    /// Creates an optimizer for `len` parameters with zeroed moments.
    #[must_use]
    pub fn new(len: usize, params: AdamParams) -> Self {
        Self {
            params,
            m1: vec![0.0; len],
            m2: vec![0.0; len],
            t: 0,
        }
    }

    /// Number of steps taken so far.
    #[must_use]
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Folds `grad` into the moment estimates and returns the update direction.
    ///
    /// # Panics
    ///
    /// Panics if `params` or `grad` does not match the optimizer's length.
    pub fn step(&mut self, params: &[f64], grad: &[f64]) -> Vec<f64> {
        assert_eq!(params.len(), self.m1.len());
        assert_eq!(grad.len(), self.m1.len());

        let AdamParams {
            beta1,
            beta2,
            eps,
            l1_decay,
        } = self.params;

        self.t = self.t.saturating_add(1);
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        self.m1
            .iter_mut()
            .zip(&mut self.m2)
            .zip(grad.iter().zip(params))
            .map(|((m1, m2), (&g, &p))| {
                *m1 = beta1 * *m1 + (1.0 - beta1) * g;
                *m2 = beta2 * *m2 + (1.0 - beta2) * g * g;
                let mhat = *m1 / bias1;
                let vhat = *m2 / bias2;
                mhat / (vhat.sqrt() + eps) + l1_decay * sign(p)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_gradient_gives_unit_update() {
        let mut adam = Adam::new(1, AdamParams::default());
        let mut update = vec![];
        for _ in 0..5000 {
            update = adam.step(&[1.0], &[0.37]);
        }
        assert!((update[0] - 1.0).abs() < 1e-6);
        assert_eq!(adam.steps(), 5000);
    }

    #[test]
    fn test_first_step_is_bias_corrected() {
        let mut adam = Adam::new(3, AdamParams::default());
        let update = adam.step(&[0.0, 0.0, 0.0], &[4.0, -0.001, 0.0]);
        assert!((update[0] - 1.0).abs() < 1e-6);
        assert!((update[1] + 1.0).abs() < 1e-4);
        assert_eq!(update[2], 0.0);
    }

    #[test]
    fn test_update_direction_follows_gradient_sign() {
        let mut adam = Adam::new(2, AdamParams::default());
        for _ in 0..100 {
            let update = adam.step(&[5.0, 5.0], &[-2.0, 0.5]);
            assert!(update[0] < 0.0);
            assert!(update[1] > 0.0);
        }
    }

    #[test]
    fn test_l1_decay_uses_parameter_sign() {
        let mut adam = Adam::new(
            3,
            AdamParams {
                l1_decay: 0.25,
                ..AdamParams::default()
            },
        );
        let update = adam.step(&[3.0, -2.0, 0.0], &[0.0, 0.0, 0.0]);
        assert_eq!(update, vec![0.25, -0.25, 0.0]);
    }

    #[test]
    #[should_panic(expected = "assertion")]
    fn test_length_mismatch_panics() {
        let mut adam = Adam::new(2, AdamParams::default());
        let _ = adam.step(&[0.0, 0.0], &[1.0]);
    }
}
