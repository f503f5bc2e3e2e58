//! Conversion between the structured [`ParamSet`] and the optimizer's flat vector.
//!
//! The round trip is lossless up to integer truncation: the oracle only accepts integers, so
//! [`ParamCodec::unflatten_and_emit`] truncates each slot toward zero, while the optimizer keeps
//! working with the un-truncated floats between iterations.

use std::collections::BTreeMap;

use crate::{
    param_set::{ParamSet, ParamValue},
    schema::{ParamKind, ParamSchema, SchemaError, SymmetryPolicy, TuneSpec},
};

/// Width of a row in a symmetric table.
pub const ROW_WIDTH: usize = 8;
const HALF_WIDTH: usize = ROW_WIDTH / 2;

/// Keeps the left half of every 8-wide row.
///
/// # Panics
///
/// Panics if `table.len()` is not a multiple of [`ROW_WIDTH`].
#[must_use]
pub fn compress_symmetric<T>(table: &[T]) -> Vec<T>
where
    T: Copy,
{
    assert_eq!(table.len() % ROW_WIDTH, 0, "table is not made of whole rows");
    table
        .chunks_exact(ROW_WIDTH)
        .flat_map(|row| row[..HALF_WIDTH].iter().copied())
        .collect()
}

/// Mirrors every 4-wide half row out to a full 8-wide row.
///
/// # Panics
///
/// Panics if `half.len()` is not a multiple of 4.
#[must_use]
pub fn expand_symmetric<T>(half: &[T]) -> Vec<T>
where
    T: Copy,
{
    assert_eq!(half.len() % HALF_WIDTH, 0, "table is not made of whole half rows");
    half.chunks_exact(HALF_WIDTH)
        .flat_map(|row| row.iter().chain(row.iter().rev()).copied())
        .collect()
}

/// Returns the first `(row, col)` whose value differs from its mirror image, if any.
#[must_use]
pub fn find_asymmetry(table: &[i64]) -> Option<(usize, usize)> {
    table
        .chunks_exact(ROW_WIDTH)
        .enumerate()
        .find_map(|(row, cells)| {
            (0..HALF_WIDTH)
                .find(|&col| cells[col] != cells[ROW_WIDTH - 1 - col])
                .map(|col| (row, col))
        })
}

/// Replaces every mirrored pair of a table with the pair's average, truncated toward zero.
pub fn symmetrize(table: &mut [i64]) {
    for row in table.chunks_exact_mut(ROW_WIDTH) {
        for col in 0..HALF_WIDTH {
            let avg = (row[col] + row[ROW_WIDTH - 1 - col]) / 2;
            row[col] = avg;
            row[ROW_WIDTH - 1 - col] = avg;
        }
    }
}

#[expect(clippy::cast_possible_truncation)]
fn to_oracle_int(value: f64) -> i64 {
    value.trunc() as i64
}

#[expect(clippy::cast_precision_loss)]
fn to_slot(value: i64) -> f64 {
    value as f64
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum CodecError {
    #[display("tunable parameter '{name}' is missing")]
    MissingParameter { name: String },
    #[display("parameter '{name}' has {actual} values, expected {expected}")]
    ParameterLength {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[display("flat vector has {actual} entries, expected {expected}")]
    VectorLength { expected: usize, actual: usize },
}

/// The tunable parameters of a [`ParamSet`], each as a plain sequence of integers.
///
/// Scalars are wrapped as one-element sequences; symmetric tables are still full-width here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunableSubset(BTreeMap<String, Vec<i64>>);

impl TunableSubset {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[i64]> {
        self.0.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Flattens and emits parameter sets according to a resolved [`ParamSchema`].
///
/// The codec owns the base parameter set; emitted artifacts start from it and override only
/// the tunable entries, so the oracle always receives every parameter.
#[derive(Debug, Clone)]
pub struct ParamCodec {
    schema: ParamSchema,
    base: ParamSet,
}

impl ParamCodec {
    /// Resolves `spec` against `base` and builds a codec.
    ///
    /// With [`SymmetryPolicy::Average`], tunable symmetric tables in `base` are symmetrized
    /// before validation; with [`SymmetryPolicy::Strict`], an asymmetric table is an error.
    pub fn new(
        mut base: ParamSet,
        spec: &TuneSpec,
        policy: SymmetryPolicy,
    ) -> Result<Self, SchemaError> {
        if policy == SymmetryPolicy::Average {
            for name in spec.tune.iter().filter(|name| spec.is_symmetric(name)) {
                if let Some(ParamValue::Table(table)) = base.get_mut(name) {
                    symmetrize(table);
                }
            }
        }
        let schema = ParamSchema::resolve(&base, spec)?;
        Ok(Self { schema, base })
    }

    #[must_use]
    pub fn schema(&self) -> &ParamSchema {
        &self.schema
    }

    #[must_use]
    pub fn base(&self) -> &ParamSet {
        &self.base
    }

    /// Filters `full` down to the tunable parameters.
    pub fn select(&self, full: &ParamSet) -> Result<TunableSubset, CodecError> {
        self.schema
            .descriptors()
            .iter()
            .map(|desc| -> Result<_, CodecError> {
                let value = full
                    .get(&desc.name)
                    .ok_or_else(|| CodecError::MissingParameter {
                        name: desc.name.clone(),
                    })?;
                Ok((desc.name.clone(), value.values().to_vec()))
            })
            .collect::<Result<_, _>>()
            .map(TunableSubset)
    }

    /// Concatenates the subset in schema order, halving symmetric tables.
    pub fn flatten(&self, subset: &TunableSubset) -> Result<Vec<f64>, CodecError> {
        let mut flat = Vec::with_capacity(self.schema.total_slots());
        for desc in self.schema.descriptors() {
            let values = subset
                .get(&desc.name)
                .ok_or_else(|| CodecError::MissingParameter {
                    name: desc.name.clone(),
                })?;
            if values.len() != desc.len {
                return Err(CodecError::ParameterLength {
                    name: desc.name.clone(),
                    expected: desc.len,
                    actual: values.len(),
                });
            }
            match desc.kind {
                ParamKind::Scalar | ParamKind::Table => {
                    flat.extend(values.iter().copied().map(to_slot));
                }
                ParamKind::SymmetricTable => {
                    flat.extend(compress_symmetric(values).into_iter().map(to_slot));
                }
            }
        }
        Ok(flat)
    }

    /// The flat vector of the base parameter set.
    pub fn initial_vector(&self) -> Result<Vec<f64>, CodecError> {
        self.flatten(&self.select(&self.base)?)
    }

    /// Rebuilds the full parameter set from a flat vector.
    pub fn unflatten_and_emit(&self, flat: &[f64]) -> Result<ParamSet, CodecError> {
        let expected = self.schema.total_slots();
        if flat.len() != expected {
            return Err(CodecError::VectorLength {
                expected,
                actual: flat.len(),
            });
        }

        let mut emitted = self.base.clone();
        let mut rest = flat;
        for desc in self.schema.descriptors() {
            let (slots, tail) = rest.split_at(desc.slots());
            rest = tail;
            let ints = slots.iter().copied().map(to_oracle_int).collect::<Vec<_>>();
            let value = match desc.kind {
                ParamKind::Scalar => ParamValue::Scalar(ints[0]),
                ParamKind::Table => ParamValue::Table(ints),
                ParamKind::SymmetricTable => ParamValue::Table(expand_symmetric(&ints)),
            };
            emitted.insert(desc.name.clone(), value);
        }
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(tune: &[&str], symmetric: &[&str]) -> TuneSpec {
        TuneSpec {
            tune: tune.iter().map(|s| (*s).to_owned()).collect(),
            symmetric: symmetric.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    fn mirrored_rows(rows: usize, seed: i64) -> Vec<i64> {
        let half = (0..rows * HALF_WIDTH)
            .map(|i| (i as i64 * 37 + seed) % 101 - 50)
            .collect::<Vec<_>>();
        expand_symmetric(&half)
    }

    #[test]
    fn test_expand_mirrors_half_row() {
        assert_eq!(expand_symmetric(&[1, 2, 3, 4]), vec![1, 2, 3, 4, 4, 3, 2, 1]);
    }

    #[test]
    fn test_compress_keeps_left_half() {
        assert_eq!(compress_symmetric(&[1, 2, 3, 4, 4, 3, 2, 1]), vec![1, 2, 3, 4]);
        assert_eq!(
            compress_symmetric(&[1, 2, 3, 4, 9, 9, 9, 9, 5, 6, 7, 8, 0, 0, 0, 0]),
            vec![1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn test_expand_then_compress_is_identity() {
        for rows in 1..=8 {
            let half = (0..rows * HALF_WIDTH)
                .map(|i| i as i64 * 3 - 11)
                .collect::<Vec<_>>();
            assert_eq!(compress_symmetric(&expand_symmetric(&half)), half);
        }
    }

    #[test]
    fn test_compress_then_expand_on_symmetric_tables() {
        for seed in 0..10 {
            let table = mirrored_rows(8, seed);
            assert_eq!(find_asymmetry(&table), None);
            assert_eq!(expand_symmetric(&compress_symmetric(&table)), table);
        }
    }

    #[test]
    fn test_expanded_rows_are_mirror_symmetric() {
        let table = expand_symmetric(&[5.5, -1.0, 0.25, 7.0, 1.0, 2.0, 3.0, 4.0]);
        for row in table.chunks_exact(ROW_WIDTH) {
            let reversed = row.iter().rev().copied().collect::<Vec<_>>();
            assert_eq!(row, reversed.as_slice());
        }
    }

    #[test]
    fn test_symmetrize_averages_pairs() {
        let mut table = vec![0, 5, 9, 43, 81, 138, 239, 0];
        symmetrize(&mut table);
        assert_eq!(table, vec![0, 122, 73, 62, 62, 73, 122, 0]);

        let mut negative = vec![-3, 0, 0, 0, 0, 0, 0, 0];
        symmetrize(&mut negative);
        assert_eq!(negative[0], -1);
        assert_eq!(negative[7], -1);
    }

    #[test]
    fn test_symmetric_parameter_serializes_mirrored() {
        let mut base = ParamSet::new();
        base.insert("row", ParamValue::Table(vec![1, 2, 3, 4, 4, 3, 2, 1]));
        let codec = ParamCodec::new(base, &spec(&["row"], &["row"]), SymmetryPolicy::Strict)
            .unwrap();

        let flat = codec.initial_vector().unwrap();
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0]);

        let emitted = codec.unflatten_and_emit(&flat).unwrap();
        assert_eq!(
            emitted.get("row"),
            Some(&ParamValue::Table(vec![1, 2, 3, 4, 4, 3, 2, 1]))
        );
        let reflattened = codec.flatten(&codec.select(&emitted).unwrap()).unwrap();
        assert_eq!(reflattened, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_round_trip_up_to_truncation() {
        let mut base = ParamSet::new();
        base.insert("pst", ParamValue::Table(mirrored_rows(8, 3)));
        base.insert("adj", ParamValue::Table(vec![-91, -23, -9, 2, 8, 15, 21, 30, 46]));
        base.insert("tempo", ParamValue::Scalar(12));
        base.insert("untouched", ParamValue::Scalar(99));
        let codec = ParamCodec::new(
            base,
            &spec(&["pst", "adj", "tempo"], &["pst"]),
            SymmetryPolicy::Strict,
        )
        .unwrap();

        let mut flat = codec.initial_vector().unwrap();
        assert_eq!(flat.len(), 32 + 9 + 1);
        for (i, v) in flat.iter_mut().enumerate() {
            *v += if i % 2 == 0 { 0.75 } else { -0.75 };
        }

        let emitted = codec.unflatten_and_emit(&flat).unwrap();
        assert_eq!(emitted.get("untouched"), Some(&ParamValue::Scalar(99)));
        let reflattened = codec.flatten(&codec.select(&emitted).unwrap()).unwrap();
        let expected = flat.iter().map(|v| v.trunc()).collect::<Vec<_>>();
        assert_eq!(reflattened, expected);
    }

    #[test]
    fn test_unflatten_rejects_wrong_length() {
        let mut base = ParamSet::new();
        base.insert("tempo", ParamValue::Scalar(1));
        let codec = ParamCodec::new(base, &spec(&["tempo"], &[]), SymmetryPolicy::Strict).unwrap();
        assert_eq!(
            codec.unflatten_and_emit(&[1.0, 2.0]).unwrap_err(),
            CodecError::VectorLength {
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_select_reports_missing_parameter() {
        let mut base = ParamSet::new();
        base.insert("tempo", ParamValue::Scalar(1));
        let codec = ParamCodec::new(base, &spec(&["tempo"], &[]), SymmetryPolicy::Strict).unwrap();
        let err = codec.select(&ParamSet::new()).unwrap_err();
        assert!(matches!(err, CodecError::MissingParameter { .. }));
    }

    #[test]
    fn test_average_policy_accepts_asymmetric_table() {
        let mut base = ParamSet::new();
        base.insert("passed", ParamValue::Table(vec![0, 5, 9, 43, 81, 138, 239, 0]));
        let spec = spec(&["passed"], &["passed"]);

        let err = ParamCodec::new(base.clone(), &spec, SymmetryPolicy::Strict).unwrap_err();
        assert!(err.is_asymmetric());

        let codec = ParamCodec::new(base, &spec, SymmetryPolicy::Average).unwrap();
        assert_eq!(codec.initial_vector().unwrap(), vec![0.0, 122.0, 73.0, 62.0]);
    }
}
