//! Labeled positions and the endless batch stream drawn from them.
//!
//! The dataset is a text file with one EPD record per line, the game result quoted at the end:
//!
//! ```text
//! rnbqkb1r/pp3ppp/2p1pn2/3p4/2PP4/2N1PN2/PP3PPP/R1BQKB1R b KQkq - c9 "1/2-1/2";
//! ```
//!
//! Only the four FEN fields of the record are kept; zero move counters are appended so the
//! oracle receives a complete FEN.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg64;

const EPD_FIELDS: usize = 4;

/// A position together with the outcome of the game it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSample {
    pub position: String,
    /// Label of the quoted result token: 1.0 for `1-0`, 0.0 for `0-1`, 0.5 for `1/2-1/2`.
    pub label: f64,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DatasetError {
    #[display("failed to read dataset {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("line {line}: missing quoted game result")]
    MissingOutcome { line: usize },
    #[display("line {line}: unknown game result {token:?}")]
    UnknownOutcome { line: usize, token: String },
    #[display("line {line}: position has fewer than {} fields", EPD_FIELDS)]
    MalformedPosition { line: usize },
    #[display("dataset contains no positions")]
    Empty,
}

/// Maps a PGN result token to a label.
#[must_use]
pub fn outcome_label(token: &str) -> Option<f64> {
    match token {
        "1-0" => Some(1.0),
        "0-1" => Some(0.0),
        "1/2-1/2" => Some(0.5),
        _ => None,
    }
}

/// Parses one dataset line. Blank lines yield `Ok(None)`.
///
/// `line_no` is only used in error messages.
pub fn parse_labeled_line(line: &str, line_no: usize) -> Result<Option<PositionSample>, DatasetError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut parts = line.split('"');
    let record = parts.next().unwrap_or_default();
    let token = parts
        .next()
        .ok_or(DatasetError::MissingOutcome { line: line_no })?;
    let label = outcome_label(token).ok_or_else(|| DatasetError::UnknownOutcome {
        line: line_no,
        token: token.to_owned(),
    })?;

    let fields = record.split_whitespace().take(EPD_FIELDS).collect::<Vec<_>>();
    if fields.len() < EPD_FIELDS {
        return Err(DatasetError::MalformedPosition { line: line_no });
    }
    Ok(Some(PositionSample {
        position: format!("{} 0 0", fields.join(" ")),
        label,
    }))
}

/// All labeled positions, in the order batches will be drawn.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<PositionSample>,
}

impl Dataset {
    #[must_use]
    pub fn from_samples(samples: Vec<PositionSample>) -> Self {
        Self { samples }
    }

    /// Reads and parses a dataset file.
    pub fn load<P>(path: P) -> Result<Self, DatasetError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses dataset text, one record per line.
    pub fn parse(text: &str) -> Result<Self, DatasetError> {
        let mut samples = vec![];
        for (i, line) in text.lines().enumerate() {
            if let Some(sample) = parse_labeled_line(line, i + 1)? {
                samples.push(sample);
            }
        }
        Ok(Self { samples })
    }

    /// Reorders the samples with a deterministic shuffle.
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = Pcg64::seed_from_u64(seed);
        self.samples.shuffle(&mut rng);
    }

    #[must_use]
    pub fn samples(&self) -> &[PositionSample] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Endless cyclic view over a [`Dataset`].
///
/// Iterating never returns `None`: after the last sample it starts over from the first.
#[derive(Debug, Clone)]
pub struct BatchCycle {
    dataset: Dataset,
    cursor: usize,
    drawn: u64,
}

impl BatchCycle {
    pub fn new(dataset: Dataset) -> Result<Self, DatasetError> {
        if dataset.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Self {
            dataset,
            cursor: 0,
            drawn: 0,
        })
    }

    /// Takes the next `size` samples, wrapping around the end of the dataset.
    pub fn next_batch(&mut self, size: usize) -> Vec<PositionSample> {
        self.by_ref().take(size).collect()
    }

    /// Total number of samples handed out so far.
    #[must_use]
    pub fn drawn(&self) -> u64 {
        self.drawn
    }
}

impl Iterator for BatchCycle {
    type Item = PositionSample;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.dataset.samples[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.dataset.len();
        self.drawn += 1;
        Some(sample)
    }
}
