/// Linear warmup followed by inverse square root decay.
///
/// ```text
/// factor(t) = t / warmup                for t < warmup
///           = 1                         for warmup <= t < decay_start
///           = sqrt(decay_start / t)     for t >= decay_start
/// ```
///
/// A `decay_start` of zero is rejected by [`Trainer::new`](crate::trainer::Trainer::new); `factor` itself stays finite and
/// treats iteration 0 as undecayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningRateSchedule {
    pub base: f64,
    pub warmup: usize,
    pub decay_start: usize,
}

impl Default for LearningRateSchedule {
    fn default() -> Self {
        Self {
            base: 0.5,
            warmup: 50,
            decay_start: 1000,
        }
    }
}

impl LearningRateSchedule {
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn factor(&self, t: usize) -> f64 {
        if t < self.warmup {
            t as f64 / self.warmup as f64
        } else if t < self.decay_start || t == 0 {
            1.0
        } else {
            (self.decay_start as f64 / t as f64).sqrt()
        }
    }

    #[must_use]
    pub fn learning_rate(&self, t: usize) -> f64 {
        self.base * self.factor(t)
    }
}
