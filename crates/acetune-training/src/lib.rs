//! Gradient-based tuning of evaluation parameters against an external oracle.
//!
//! The oracle only exposes scores, never derivatives, so gradients are estimated by finite
//! differences: every tunable parameter is nudged in turn, the same batch of positions is
//! re-scored, and the score deltas form a per-sample Jacobian. That Jacobian is pushed through a
//! logistic win-probability model and a cross-entropy loss against game outcomes, and the
//! resulting gradient drives an Adam optimizer.
//!
//! # How Training Works
//!
//! 1. **Restart** - A fresh oracle process is started every iteration
//! 2. **Batch** - The next positions are drawn from an endless cycle over the dataset
//! 3. **Estimate** - Baseline scores plus one re-scoring per tunable parameter give the loss and
//!    its gradient
//! 4. **Update** - Adam turns the gradient into an update, scaled by the learning-rate schedule
//! 5. **Persist** - The parameters are checkpointed and the loss is appended to the loss log
//!
//! An oracle failure anywhere in steps 1-3 discards the iteration: no update is applied and the
//! next iteration starts with a restart.
//!
//! # Architecture
//!
//! ```text
//! Dataset (labeled positions)
//!     ↓ BatchCycle
//! Batch
//!     ↓ GradientEstimator (ParamCodec + Oracle, forward differences)
//! Scores + Jacobian
//!     ↓ loss::cross_entropy
//! Loss + Gradient
//!     ↓ Adam + LearningRateSchedule
//! Flat parameter vector
//!     ↓ ParamCodec::unflatten_and_emit
//! Checkpoint
//! ```
//!
//! # Cost
//!
//! One estimate takes `batch_size × (1 + tunable_slots)` oracle round trips, all sequential
//! because the oracle holds a single loaded parameter set. Batch size and the number of tuned
//! parameters have to be chosen together.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//!
//! use acetune_oracle::{OracleCommand, ProcessOracle};
//! use acetune_params::{ParamCodec, ParamSet, SymmetryPolicy, TuneSpec};
//! use acetune_training::{
//!     dataset::{BatchCycle, Dataset},
//!     trainer::{Trainer, TrainerConfig, TrainingArtifacts},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let base = ParamSet::open("params.json.backup")?;
//! let codec = ParamCodec::new(base, &TuneSpec::default(), SymmetryPolicy::Strict)?;
//! let initial = codec.initial_vector()?;
//! let batches = BatchCycle::new(Dataset::load("quiet-labeled.epd")?)?;
//!
//! let mut trainer = Trainer::new(
//!     TrainerConfig::default(),
//!     codec,
//!     initial,
//!     batches,
//!     TrainingArtifacts::default(),
//! )?;
//! let mut oracle = ProcessOracle::new(OracleCommand {
//!     program: "./tuner_eval".into(),
//!     args: vec![],
//!     artifact_path: "params.json".into(),
//! });
//! let summary = trainer.run(&mut oracle, &AtomicBool::new(false))?;
//! println!("{summary:?}");
//! # Ok(())
//! # }
//! ```

pub mod adam;
pub mod dataset;
pub mod gradient;
pub mod loss;
pub mod schedule;
pub mod trainer;

#[cfg(test)]
mod testing {
    use acetune_oracle::{Oracle, OracleError};
    use acetune_params::ParamSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum OracleEvent {
        Restart,
        Reload,
        Evaluate(String),
    }

    type ScoreFn = Box<dyn Fn(&ParamSet, &str) -> i64>;

    /// Scripted in-memory oracle that records every call.
    pub(crate) struct FakeOracle {
        score: ScoreFn,
        loaded: ParamSet,
        running: bool,
        evaluations: usize,
        /// 1-based index of the evaluation at which the oracle closes its output.
        pub(crate) close_at: Option<usize>,
        pub(crate) events: Vec<OracleEvent>,
    }

    impl FakeOracle {
        pub(crate) fn new<F>(score: F) -> Self
        where
            F: Fn(&ParamSet, &str) -> i64 + 'static,
        {
            Self {
                score: Box::new(score),
                loaded: ParamSet::new(),
                running: false,
                evaluations: 0,
                close_at: None,
                events: vec![],
            }
        }

        /// Starts in the running state, as if `restart` had been called.
        pub(crate) fn started<F>(score: F) -> Self
        where
            F: Fn(&ParamSet, &str) -> i64 + 'static,
        {
            let mut oracle = Self::new(score);
            oracle.running = true;
            oracle
        }

        pub(crate) fn count(&self, event: &OracleEvent) -> usize {
            self.events.iter().filter(|e| *e == event).count()
        }

        pub(crate) fn reloads(&self) -> usize {
            self.count(&OracleEvent::Reload)
        }
    }

    impl Oracle for FakeOracle {
        fn restart(&mut self) -> Result<(), OracleError> {
            self.events.push(OracleEvent::Restart);
            self.running = true;
            Ok(())
        }

        fn reload(&mut self, params: &ParamSet) -> Result<(), OracleError> {
            if !self.running {
                return Err(OracleError::NotRunning);
            }
            self.events.push(OracleEvent::Reload);
            self.loaded = params.clone();
            Ok(())
        }

        fn evaluate(&mut self, position: &str) -> Result<i64, OracleError> {
            if !self.running {
                return Err(OracleError::NotRunning);
            }
            self.events.push(OracleEvent::Evaluate(position.to_owned()));
            self.evaluations += 1;
            if self.close_at == Some(self.evaluations) {
                self.running = false;
                return Err(OracleError::Closed);
            }
            Ok((self.score)(&self.loaded, position))
        }
    }

    /// Value of a scalar parameter in `params`, or 0 if absent.
    pub(crate) fn scalar(params: &ParamSet, name: &str) -> i64 {
        params.get(name).map_or(0, |v| v.values()[0])
    }
}
