use std::{
    f64::consts::LN_10,
    num::NonZeroUsize,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use acetune_oracle::{OracleCommand, ProcessOracle};
use acetune_params::{ParamCodec, ParamSet};
use acetune_training::{
    adam::AdamParams,
    dataset::{BatchCycle, Dataset},
    gradient::GradientEstimator,
    schedule::LearningRateSchedule,
    trainer::{StopReason, Trainer, TrainerConfig, TrainingArtifacts},
};
use anyhow::Context as _;
use tracing::info;

use super::ParamArgs;

/// Starting point of the flat parameter vector.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum InitMode {
    /// The values in the base parameter set
    #[default]
    Base,
    /// All tunable parameters set to zero
    Zero,
    /// The values in an existing checkpoint
    Checkpoint,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TuneArg {
    #[clap(flatten)]
    params: ParamArgs,
    /// Oracle executable
    #[arg(long, default_value = "./tuner_eval")]
    oracle: PathBuf,
    /// Argument passed to the oracle; may be repeated
    #[arg(long = "oracle-arg", allow_hyphen_values = true)]
    oracle_args: Vec<String>,
    /// Configuration artifact the oracle reloads on `load`
    #[arg(long, default_value = "params.json")]
    artifact: PathBuf,
    /// Checkpoint overwritten after every completed iteration
    #[arg(long, default_value = "params_best.json")]
    checkpoint: PathBuf,
    /// Loss log appended after every completed iteration
    #[arg(long, default_value = "training_loss.txt")]
    loss_log: PathBuf,
    /// Labeled positions, one EPD record with a quoted result per line
    #[arg(long, default_value = "quiet-labeled.epd")]
    dataset: PathBuf,
    /// Shuffle the dataset with this seed before training
    #[arg(long)]
    seed: Option<u64>,
    /// Initial parameters: base, zero or checkpoint
    #[arg(long, default_value = "base")]
    init: InitMode,
    #[arg(long, default_value = "320")]
    batch_size: NonZeroUsize,
    #[arg(long, default_value_t = 0.5)]
    learning_rate: f64,
    /// Iterations of linear learning-rate warmup
    #[arg(long, default_value_t = 50)]
    warmup: usize,
    /// Iteration after which the learning rate decays as 1/sqrt(t)
    #[arg(long, default_value = "1000")]
    decay_start: NonZeroUsize,
    #[arg(long, default_value_t = 0.001)]
    l1_decay: f64,
    /// Finite-difference step in oracle units
    #[arg(long, default_value_t = 2.0)]
    fd_step: f64,
    /// Factor converting oracle scores to model units
    #[arg(long, default_value_t = 1.35)]
    score_scale: f64,
    /// Logistic scale of the win-probability model [default: ln(10)/300]
    #[arg(long)]
    loss_scale: Option<f64>,
    /// Stop after this many iterations instead of running until Ctrl-C
    #[arg(long)]
    max_iterations: Option<usize>,
}

impl TuneArg {
    fn config(&self) -> TrainerConfig {
        TrainerConfig {
            batch_size: self.batch_size.get(),
            schedule: LearningRateSchedule {
                base: self.learning_rate,
                warmup: self.warmup,
                decay_start: self.decay_start.get(),
            },
            adam: AdamParams {
                l1_decay: self.l1_decay,
                ..AdamParams::default()
            },
            estimator: GradientEstimator {
                fd_step: self.fd_step,
                score_scale: self.score_scale,
                loss_scale: self.loss_scale.unwrap_or(LN_10 / 300.0),
            },
            max_iterations: self.max_iterations,
        }
    }

    fn initial_params(&self, codec: &ParamCodec) -> anyhow::Result<Vec<f64>> {
        let params = match self.init {
            InitMode::Base => codec.initial_vector()?,
            InitMode::Zero => vec![0.0; codec.schema().total_slots()],
            InitMode::Checkpoint => {
                let checkpoint = ParamSet::open(&self.checkpoint).with_context(|| {
                    format!("Failed to load checkpoint: {}", self.checkpoint.display())
                })?;
                codec.flatten(&codec.select(&checkpoint)?)?
            }
        };
        Ok(params)
    }
}

pub(crate) fn run(arg: &TuneArg) -> anyhow::Result<()> {
    let codec = arg.params.load_codec()?;
    let initial = arg.initial_params(&codec)?;

    let mut dataset = Dataset::load(&arg.dataset)
        .with_context(|| format!("Failed to load dataset: {}", arg.dataset.display()))?;
    if let Some(seed) = arg.seed {
        dataset.shuffle(seed);
    }
    info!(
        positions = dataset.len(),
        parameters = codec.schema().descriptors().len(),
        slots = codec.schema().total_slots(),
        "loaded dataset"
    );
    let batches = BatchCycle::new(dataset)
        .with_context(|| format!("No positions in {}", arg.dataset.display()))?;

    let artifacts = TrainingArtifacts {
        checkpoint_path: arg.checkpoint.clone(),
        loss_log_path: arg.loss_log.clone(),
    };
    let mut trainer = Trainer::new(arg.config(), codec, initial, batches, artifacts)?;
    let mut oracle = ProcessOracle::new(OracleCommand {
        program: arg.oracle.clone(),
        args: arg.oracle_args.clone(),
        artifact_path: arg.artifact.clone(),
    });

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .context("Failed to install Ctrl-C handler")?;
    }

    let summary = trainer.run(&mut oracle, &stop)?;
    oracle.shutdown();

    match summary.stop {
        StopReason::Interrupted => info!("interrupted"),
        StopReason::IterationLimit => info!("iteration limit reached"),
    }
    eprintln!(
        "{} iterations ({} completed, {} discarded), last loss {}",
        summary.iterations,
        summary.completed,
        summary.discarded,
        summary
            .last_loss
            .map_or_else(|| "n/a".to_owned(), |loss| format!("{loss:.5}")),
    );
    eprintln!("Checkpoint: {}", arg.checkpoint.display());
    Ok(())
}
