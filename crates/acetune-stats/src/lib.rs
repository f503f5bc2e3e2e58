//! Statistics used when reporting on tuning runs.
//!
//! - [`descriptive`]: summaries of a batch of values (update magnitudes, loss windows)
//! - [`elo`]: converting match results between two parameter sets into an Elo difference
//!
//! # Examples
//!
//! ```
//! use acetune_stats::descriptive::DescriptiveStats;
//!
//! let stats = DescriptiveStats::new([0.5, -1.5, 1.0]).unwrap();
//! assert_eq!(stats.max, 1.0);
//! assert_eq!(stats.mean_abs, 1.0);
//! ```
//!
//! ```
//! use acetune_stats::elo::{self, MatchResults};
//!
//! let results = MatchResults { wins: 60, draws: 0, losses: 40 };
//! let estimate = elo::estimate(results, 0.9).unwrap();
//! assert!(estimate.lower < estimate.elo && estimate.elo < estimate.upper);
//! ```

pub mod descriptive;
pub mod elo;
