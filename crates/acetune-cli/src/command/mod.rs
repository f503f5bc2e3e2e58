use std::path::PathBuf;

use acetune_params::{ParamCodec, ParamSet, SymmetryPolicy, TuneSpec};
use anyhow::Context as _;
use clap::{Parser, Subcommand};

use self::{elo::EloArg, inspect::InspectArg, tune::TuneArg};
use crate::logging;

mod elo;
mod inspect;
mod tune;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Tune parameters against the evaluation oracle until interrupted
    Tune(#[clap(flatten)] TuneArg),
    /// Print the flat layout of the tunable parameters and check the codec round trip
    Inspect(#[clap(flatten)] InspectArg),
    /// Estimate an Elo difference from match results
    Elo(#[clap(flatten)] EloArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    logging::init()?;
    match args.mode {
        Mode::Tune(arg) => tune::run(&arg)?,
        Mode::Inspect(arg) => inspect::run(&arg)?,
        Mode::Elo(arg) => elo::run(&arg),
    }
    Ok(())
}

/// Where the base parameters come from and which of them are tuned.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ParamArgs {
    /// Base parameter set; every parameter the oracle needs must be present
    #[arg(long, default_value = "params.json.backup")]
    params: PathBuf,
    /// JSON file with `tune` and `symmetric` name lists [default: built-in lists]
    #[arg(long)]
    tune_spec: Option<PathBuf>,
    /// Average mirrored cells of asymmetric symmetric tables instead of rejecting them
    #[arg(long)]
    symmetrize: bool,
}

impl ParamArgs {
    pub(crate) fn load_codec(&self) -> anyhow::Result<ParamCodec> {
        let base = ParamSet::open(&self.params)
            .with_context(|| format!("Failed to load base parameters: {}", self.params.display()))?;
        let spec = match &self.tune_spec {
            Some(path) => TuneSpec::open(path)
                .with_context(|| format!("Failed to load tuning spec: {}", path.display()))?,
            None => TuneSpec::default(),
        };
        let policy = if self.symmetrize {
            SymmetryPolicy::Average
        } else {
            SymmetryPolicy::Strict
        };
        ParamCodec::new(base, &spec, policy).with_context(|| {
            format!(
                "Parameters in {} do not match the tuning spec",
                self.params.display()
            )
        })
    }
}
