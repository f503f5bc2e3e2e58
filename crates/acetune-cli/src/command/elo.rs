use acetune_stats::elo::{self, MatchResults};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EloArg {
    #[arg(long)]
    wins: u64,
    #[arg(long, default_value_t = 0)]
    draws: u64,
    #[arg(long)]
    losses: u64,
    /// Half-width of the interval in standard errors
    #[arg(long, default_value_t = 0.9)]
    z: f64,
}

pub(crate) fn run(arg: &EloArg) {
    let results = MatchResults {
        wins: arg.wins,
        draws: arg.draws,
        losses: arg.losses,
    };
    let Some(estimate) = elo::estimate(results, arg.z) else {
        eprintln!("No games played");
        return;
    };
    let score = results.score().unwrap_or_default();
    println!(
        "Elo {:+.1} [{:+.1}, {:+.1}] from {} games, score {:.1}%",
        estimate.elo,
        estimate.lower,
        estimate.upper,
        results.games(),
        score * 100.0
    );
    println!(
        "Log-likelihood at estimate: {:.3}",
        elo::log_likelihood(estimate.elo, results)
    );
}
