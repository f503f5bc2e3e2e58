//! Elo difference estimation from win/draw/loss counts.
//!
//! Used to compare two finished parameter sets after a self-play match. A draw counts as half
//! a win for the score, and the interval comes from a normal approximation of the score whose
//! standard error is re-evaluated at the interval bounds until it settles.

use std::f64::consts::LN_10;

/// Elo points per factor of 10 in the odds of winning.
pub const ELO_SCALE: f64 = 400.0;

const INTERVAL_ITERATIONS: usize = 100;

/// Results of a match, from the point of view of the first player.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResults {
    pub wins: u64,
    pub draws: u64,
    pub losses: u64,
}

impl MatchResults {
    #[must_use]
    pub fn games(&self) -> u64 {
        self.wins + self.draws + self.losses
    }

    /// Fraction of points scored, or `None` if no games were played.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        let games = self.games();
        (games > 0).then(|| (self.wins as f64 + 0.5 * self.draws as f64) / games as f64)
    }
}

/// Point estimate and interval of an Elo difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EloEstimate {
    pub elo: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Expected score of a player rated `elo_delta` points above its opponent.
#[must_use]
pub fn win_probability(elo_delta: f64) -> f64 {
    1.0 / (1.0 + (-elo_delta * LN_10 / ELO_SCALE).exp())
}

/// Inverse of [`win_probability`]. Returns ±infinity for a score of 1 or 0.
#[must_use]
pub fn elo_from_probability(probability: f64) -> f64 {
    -ELO_SCALE / LN_10 * (1.0 / probability - 1.0).ln()
}

/// Log-likelihood of `results` if the first player is `elo_delta` points stronger.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn log_likelihood(elo_delta: f64, results: MatchResults) -> f64 {
    let p = win_probability(elo_delta);
    let (wins, draws, losses) = (
        results.wins as f64,
        results.draws as f64,
        results.losses as f64,
    );
    wins * p.ln() + losses * (1.0 - p).ln() + 0.5 * draws * p.ln() + 0.5 * draws * (1.0 - p).ln()
}

/// Estimates the Elo difference and an interval `z` standard errors wide on each side.
///
/// Returns `None` if no games were played. A perfect or zero score yields infinite bounds.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn estimate(results: MatchResults, z: f64) -> Option<EloEstimate> {
    let score = results.score()?;
    let games = results.games() as f64;

    let mut lower = score;
    let mut upper = score;
    for _ in 0..INTERVAL_ITERATIONS {
        lower = score - z * (lower * (1.0 - lower) / games).sqrt();
        upper = score + z * (upper * (1.0 - upper) / games).sqrt();
    }

    Some(EloEstimate {
        elo: elo_from_probability(score),
        lower: elo_from_probability(lower),
        upper: elo_from_probability(upper),
    })
}
