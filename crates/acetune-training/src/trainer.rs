//! The training loop.
//!
//! [`Trainer`] owns everything that survives between iterations: the flat parameter vector,
//! the optimizer state, the batch cursor and the iteration counter. The oracle is borrowed per
//! call so that callers decide its lifetime.

use std::{
    fs::OpenOptions,
    io::{self, Write as _},
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use acetune_oracle::{Oracle, OracleError};
use acetune_params::{CodecError, FileError, ParamCodec, ParamSet};
use acetune_stats::descriptive::DescriptiveStats;
use tracing::{info, warn};

use crate::{
    adam::{Adam, AdamParams},
    dataset::BatchCycle,
    gradient::{EstimateError, GradientEstimator},
    loss::LossError,
    schedule::LearningRateSchedule,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerConfig {
    pub batch_size: usize,
    pub schedule: LearningRateSchedule,
    pub adam: AdamParams,
    pub estimator: GradientEstimator,
    /// Stop after this many iterations, discarded ones included. `None` runs until interrupted.
    pub max_iterations: Option<usize>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            batch_size: 320,
            schedule: LearningRateSchedule::default(),
            adam: AdamParams {
                l1_decay: 0.001,
                ..AdamParams::default()
            },
            estimator: GradientEstimator::default(),
            max_iterations: None,
        }
    }
}

/// Files written after every completed iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingArtifacts {
    /// Overwritten with the current parameter set.
    pub checkpoint_path: PathBuf,
    /// Each loss is appended as `"{loss:.3} "`.
    pub loss_log_path: PathBuf,
}

impl Default for TrainingArtifacts {
    fn default() -> Self {
        Self {
            checkpoint_path: "params_best.json".into(),
            loss_log_path: "training_loss.txt".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub iteration: usize,
    /// Samples drawn from the dataset since training started.
    pub samples_seen: u64,
    pub loss: f64,
    pub learning_rate: f64,
    /// Statistics of the absolute applied update `|lr·update|`; `None` with no tunable slots.
    pub update: Option<DescriptiveStats>,
}

#[derive(Debug)]
pub enum StepOutcome {
    Completed(StepReport),
    /// The oracle failed; the parameters were left untouched.
    Discarded(OracleError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    IterationLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub completed: usize,
    pub discarded: usize,
    pub last_loss: Option<f64>,
    pub stop: StopReason,
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainingError {
    #[display("failed to write checkpoint: {_0}")]
    Checkpoint(FileError),
    #[display("failed to append to loss log {}: {source}", path.display())]
    #[from(ignore)]
    LossLog { path: PathBuf, source: io::Error },
    #[display("failed to encode parameters: {_0}")]
    Codec(CodecError),
    #[display("failed to compute loss: {_0}")]
    Loss(LossError),
    #[display("invalid training configuration: {reason}")]
    #[from(ignore)]
    InvalidConfig { reason: &'static str },
}

impl TrainerConfig {
    /// Rejects settings that would make every iteration fail or poison the parameters.
    pub fn validate(&self) -> Result<(), TrainingError> {
        let reason = if self.batch_size == 0 {
            "batch size must be at least 1"
        } else if self.schedule.decay_start == 0 {
            "decay start must be at least 1"
        } else if !self.schedule.base.is_finite() {
            "learning rate must be finite"
        } else {
            return Ok(());
        };
        Err(TrainingError::InvalidConfig { reason })
    }
}

pub struct Trainer {
    config: TrainerConfig,
    codec: ParamCodec,
    params: Vec<f64>,
    optimizer: Adam,
    batches: BatchCycle,
    artifacts: TrainingArtifacts,
    iteration: usize,
}

impl Trainer {
    /// Creates a trainer starting from `initial_params`, a flat vector laid out by `codec`.
    pub fn new(
        config: TrainerConfig,
        codec: ParamCodec,
        initial_params: Vec<f64>,
        batches: BatchCycle,
        artifacts: TrainingArtifacts,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        let expected = codec.schema().total_slots();
        if initial_params.len() != expected {
            return Err(CodecError::VectorLength {
                expected,
                actual: initial_params.len(),
            }
            .into());
        }
        Ok(Self {
            optimizer: Adam::new(initial_params.len(), config.adam),
            config,
            codec,
            params: initial_params,
            batches,
            artifacts,
            iteration: 0,
        })
    }

    #[must_use]
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Number of iterations attempted so far.
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// The current parameters as a full parameter set.
    pub fn current_params(&self) -> Result<ParamSet, TrainingError> {
        Ok(self.codec.unflatten_and_emit(&self.params)?)
    }

    /// Runs one iteration.
    ///
    /// Oracle failures are reported as [`StepOutcome::Discarded`]; only failures that would
    /// repeat on every iteration (encoding, shapes, artifact I/O) are errors.
    pub fn step<O>(&mut self, oracle: &mut O) -> Result<StepOutcome, TrainingError>
    where
        O: Oracle + ?Sized,
    {
        let iteration = self.iteration;
        self.iteration += 1;

        let result = oracle.restart().map_err(EstimateError::from).and_then(|()| {
            let batch = self.batches.next_batch(self.config.batch_size);
            self.config
                .estimator
                .estimate(oracle, &self.codec, &mut self.params, &batch)
        });
        let estimate = match result {
            Ok(estimate) => estimate,
            Err(EstimateError::Oracle(err)) => {
                warn!(iteration, %err, "discarding iteration");
                return Ok(StepOutcome::Discarded(err));
            }
            Err(EstimateError::Codec(err)) => return Err(err.into()),
            Err(EstimateError::Loss(err)) => return Err(err.into()),
        };

        let learning_rate = self.config.schedule.learning_rate(iteration);
        let update = self.optimizer.step(&self.params, &estimate.gradient);
        let applied = update.iter().map(|u| learning_rate * u).collect::<Vec<_>>();
        for (p, a) in self.params.iter_mut().zip(&applied) {
            *p -= a;
        }

        self.current_params()?
            .save(&self.artifacts.checkpoint_path)?;
        self.append_loss(estimate.loss)?;

        let report = StepReport {
            iteration,
            samples_seen: self.batches.drawn(),
            loss: estimate.loss,
            learning_rate,
            update: DescriptiveStats::new(applied.iter().map(|a| a.abs())),
        };
        let (max_update, mean_update) = report
            .update
            .as_ref()
            .map_or((0.0, 0.0), |s| (s.max_abs, s.mean_abs));
        info!(
            iteration,
            samples = report.samples_seen,
            loss = report.loss,
            learning_rate,
            max_update,
            mean_update,
            "completed iteration"
        );
        Ok(StepOutcome::Completed(report))
    }

    /// Steps until `stop` is set or the iteration limit is reached.
    ///
    /// `stop` is only checked between iterations; the last checkpoint stays on disk.
    pub fn run<O>(&mut self, oracle: &mut O, stop: &AtomicBool) -> Result<TrainingSummary, TrainingError>
    where
        O: Oracle + ?Sized,
    {
        let mut completed = 0;
        let mut discarded = 0;
        let mut last_loss = None;

        let reason = loop {
            if stop.load(Ordering::Relaxed) {
                break StopReason::Interrupted;
            }
            if self
                .config
                .max_iterations
                .is_some_and(|max| self.iteration >= max)
            {
                break StopReason::IterationLimit;
            }
            match self.step(oracle)? {
                StepOutcome::Completed(report) => {
                    completed += 1;
                    last_loss = Some(report.loss);
                }
                StepOutcome::Discarded(_) => discarded += 1,
            }
        };

        info!(completed, discarded, ?reason, "training stopped");
        Ok(TrainingSummary {
            iterations: completed + discarded,
            completed,
            discarded,
            last_loss,
            stop: reason,
        })
    }

    fn append_loss(&self, loss: f64) -> Result<(), TrainingError> {
        let path = &self.artifacts.loss_log_path;
        let to_error = |source| TrainingError::LossLog {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(to_error)?;
        write!(file, "{loss:.3} ").map_err(to_error)
    }
}
