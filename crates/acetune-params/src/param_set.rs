//! The structured parameter set consumed by the oracle.

use std::{collections::BTreeMap, path::Path, slice};

use serde::{Deserialize, Serialize};

use crate::file::{self, FileError};

/// A single named parameter: an integer or an ordered table of integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(i64),
    Table(Vec<i64>),
}

impl ParamValue {
    /// Returns the values as a slice; a scalar is a one-element slice.
    #[must_use]
    pub fn values(&self) -> &[i64] {
        match self {
            Self::Scalar(v) => slice::from_ref(v),
            Self::Table(vs) => vs,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

/// Every parameter the oracle knows about, keyed by name.
///
/// This is the in-memory form of the configuration artifact and of the checkpoint. Keys are
/// kept sorted so that serialized artifacts are stable between iterations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a configuration artifact from a JSON file.
    pub fn open<P>(path: P) -> Result<Self, FileError>
    where
        P: AsRef<Path>,
    {
        file::read_json("parameter", path.as_ref())
    }

    /// Writes this set as a configuration artifact, replacing `path` atomically.
    pub fn save<P>(&self, path: P) -> Result<(), FileError>
    where
        P: AsRef<Path>,
    {
        file::write_json("parameter", path.as_ref(), self)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ParamValue> {
        self.0.get_mut(name)
    }

    pub fn insert<S>(&mut self, name: S, value: ParamValue) -> Option<ParamValue>
    where
        S: Into<String>,
    {
        self.0.insert(name.into(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
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

impl FromIterator<(String, ParamValue)> for ParamSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (String, ParamValue)>,
    {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_json_shape() {
        let json = r#"{"tempo": 12, "passed_pawn_table": [0, 5, 9, 43, 81, 138, 239, 0]}"#;
        let set: ParamSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.get("tempo"), Some(&ParamValue::Scalar(12)));
        assert_eq!(set.get("passed_pawn_table").map(ParamValue::len), Some(8));
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");

        let mut set = ParamSet::new();
        set.insert("b", ParamValue::Table(vec![-1, 2]));
        set.insert("a", ParamValue::Scalar(-7));
        set.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        // keys are written in sorted order with a four space indent
        assert!(text.starts_with("{\n    \"a\": -7,\n    \"b\": ["));
        assert!(!dir.path().join("params.json.tmp").exists());

        assert_eq!(ParamSet::open(&path).unwrap(), set);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ParamSet::open(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, FileError::Io { .. }));
    }

    #[test]
    fn test_scalar_values_slice() {
        assert_eq!(ParamValue::Scalar(3).values(), &[3]);
        assert!(ParamValue::Table(vec![]).is_empty());
    }
}
