//! Finite-difference gradient estimation through the oracle.

use std::f64::consts::LN_10;

use acetune_oracle::{Oracle, OracleError};
use acetune_params::{CodecError, ParamCodec};
use tracing::debug;

use crate::{
    dataset::PositionSample,
    loss::{self, Jacobian, LossError},
};

/// Settings of the forward-difference estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientEstimator {
    /// Amount added to one flat parameter for its perturbed evaluation, in oracle units.
    pub fd_step: f64,
    /// Converts oracle scores into the units of the probability model.
    pub score_scale: f64,
    /// Logistic scale `c` in `p = sigmoid(c·s)`.
    pub loss_scale: f64,
}

impl Default for GradientEstimator {
    fn default() -> Self {
        Self {
            fd_step: 2.0,
            score_scale: 1.35,
            loss_scale: LN_10 / 300.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientEstimate {
    /// Mean cross-entropy of the batch at the unperturbed parameters.
    pub loss: f64,
    pub gradient: Vec<f64>,
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum EstimateError {
    #[display("oracle failed: {_0}")]
    Oracle(OracleError),
    #[display("failed to encode parameters: {_0}")]
    Codec(CodecError),
    #[display("failed to compute loss: {_0}")]
    Loss(LossError),
}

#[expect(clippy::cast_precision_loss)]
fn to_score(score: i64) -> f64 {
    score as f64
}

impl GradientEstimator {
    /// Estimates the loss and its gradient at `params` over `batch`.
    ///
    /// Each entry of `params` is perturbed in place and restored before the next one, also
    /// when the oracle fails, so `params` is unchanged when this returns.
    pub fn estimate<O>(
        &self,
        oracle: &mut O,
        codec: &ParamCodec,
        params: &mut [f64],
        batch: &[PositionSample],
    ) -> Result<GradientEstimate, EstimateError>
    where
        O: Oracle + ?Sized,
    {
        let baseline = score_batch(oracle, codec, params, batch)?;

        let mut jacobian = Jacobian::zeros(batch.len(), params.len());
        for i in 0..params.len() {
            let original = params[i];
            params[i] = original + self.fd_step;
            let perturbed = score_batch(oracle, codec, params, batch);
            params[i] = original;

            for (sample, (s, s0)) in perturbed?.iter().zip(&baseline).enumerate() {
                jacobian.set(sample, i, (s - s0) / self.fd_step);
            }
            debug!(param = i, of = params.len(), "perturbed parameter");
        }

        let scores = baseline
            .iter()
            .map(|s| s * self.score_scale)
            .collect::<Vec<_>>();
        jacobian.scale(self.score_scale);
        let labels = batch.iter().map(|s| s.label).collect::<Vec<_>>();

        let (loss, gradient) = loss::cross_entropy(&scores, &jacobian, &labels, self.loss_scale)?;
        Ok(GradientEstimate { loss, gradient })
    }
}

/// Loads `params` into the oracle and scores every position of `batch`.
fn score_batch<O>(
    oracle: &mut O,
    codec: &ParamCodec,
    params: &[f64],
    batch: &[PositionSample],
) -> Result<Vec<f64>, EstimateError>
where
    O: Oracle + ?Sized,
{
    let emitted = codec.unflatten_and_emit(params)?;
    oracle.reload(&emitted)?;
    let scores = batch
        .iter()
        .map(|sample| oracle.evaluate(&sample.position).map(to_score))
        .collect::<Result<_, _>>()?;
    Ok(scores)
}
