//! Tunable parameter descriptors.
//!
//! A [`ParamSchema`] is resolved once at startup from the base [`ParamSet`] and a [`TuneSpec`].
//! After that point all shape information comes from the schema: nothing downstream looks at
//! parameter names to decide how a value is laid out.
//!
//! Resolution rejects specs that cannot be encoded losslessly:
//!
//! - a tunable name that the base set does not contain
//! - a symmetric name that is a scalar, or a table whose length is not a whole number of rows
//! - a symmetric table whose rows are not mirror images (see [`SymmetryPolicy`])

use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    codec::{ROW_WIDTH, find_asymmetry},
    file::{self, FileError},
    param_set::{ParamSet, ParamValue},
};

/// Which parameters are tuned, and which of those are mirror-symmetric tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuneSpec {
    pub tune: Vec<String>,
    #[serde(default)]
    pub symmetric: Vec<String>,
}

impl Default for TuneSpec {
    fn default() -> Self {
        Self {
            tune: ["doubled_pawn_penalty", "space_table"]
                .map(str::to_owned)
                .to_vec(),
            symmetric: [
                "bishop_table",
                "doubled_pawn_penalty",
                "isolated_pawn_penalty",
                "king_table",
                "king_table_endgame",
                "knight_table",
                "pawn_table",
                "pawn_table_endgame",
                "queen_table",
                "rook_table",
            ]
            .map(str::to_owned)
            .to_vec(),
        }
    }
}

impl TuneSpec {
    pub fn open<P>(path: P) -> Result<Self, FileError>
    where
        P: AsRef<Path>,
    {
        file::read_json("tuning spec", path.as_ref())
    }

    #[must_use]
    pub fn is_symmetric(&self, name: &str) -> bool {
        self.symmetric.iter().any(|s| s == name)
    }
}

/// How resolution treats a symmetric table whose rows are not mirror images.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetryPolicy {
    /// Reject the table with [`SchemaError::Asymmetric`].
    #[default]
    Strict,
    /// Replace each mirrored pair by the average of the pair before resolving.
    Average,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum ParamKind {
    #[display("scalar")]
    Scalar,
    #[display("table")]
    Table,
    #[display("symmetric")]
    SymmetricTable,
}

/// Name, kind and oracle-facing length of one tunable parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub len: usize,
}

impl ParamDescriptor {
    /// Number of entries this parameter occupies in the flat vector.
    #[must_use]
    pub fn slots(&self) -> usize {
        match self.kind {
            ParamKind::Scalar | ParamKind::Table => self.len,
            ParamKind::SymmetricTable => self.len / 2,
        }
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::IsVariant,
)]
pub enum SchemaError {
    #[display("tunable parameter '{name}' is not present in the base parameters")]
    UnknownParameter { name: String },
    #[display("parameter '{name}' is declared symmetric but is a scalar")]
    SymmetricScalar { name: String },
    #[display("symmetric parameter '{name}' has {len} entries, not a multiple of {}", ROW_WIDTH)]
    RaggedSymmetricTable { name: String, len: usize },
    #[display("symmetric parameter '{name}' is not mirror-symmetric at row {row}, column {col}")]
    Asymmetric { name: String, row: usize, col: usize },
}

/// Sorted, validated descriptors of every tunable parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSchema {
    descriptors: Vec<ParamDescriptor>,
}

impl ParamSchema {
    /// Resolves the tunable parameters of `spec` against `base`.
    ///
    /// Descriptors are ordered by name; duplicate names in `spec.tune` are collapsed.
    pub fn resolve(base: &ParamSet, spec: &TuneSpec) -> Result<Self, SchemaError> {
        let names = spec.tune.iter().collect::<BTreeSet<_>>();
        let descriptors = names
            .into_iter()
            .map(|name| -> Result<_, SchemaError> {
                let value = base
                    .get(name)
                    .ok_or_else(|| SchemaError::UnknownParameter { name: name.clone() })?;
                let kind = match (value, spec.is_symmetric(name)) {
                    (ParamValue::Scalar(_), false) => ParamKind::Scalar,
                    (ParamValue::Scalar(_), true) => {
                        return Err(SchemaError::SymmetricScalar { name: name.clone() });
                    }
                    (ParamValue::Table(_), false) => ParamKind::Table,
                    (ParamValue::Table(table), true) => {
                        if table.len() % ROW_WIDTH != 0 {
                            return Err(SchemaError::RaggedSymmetricTable {
                                name: name.clone(),
                                len: table.len(),
                            });
                        }
                        if let Some((row, col)) = find_asymmetry(table) {
                            return Err(SchemaError::Asymmetric {
                                name: name.clone(),
                                row,
                                col,
                            });
                        }
                        ParamKind::SymmetricTable
                    }
                };
                Ok(ParamDescriptor {
                    name: name.clone(),
                    kind,
                    len: value.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { descriptors })
    }

    #[must_use]
    pub fn descriptors(&self) -> &[ParamDescriptor] {
        &self.descriptors
    }

    /// Parameter names in flat-vector order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    /// Slot counts in flat-vector order, parallel to [`names`](Self::names).
    pub fn shapes(&self) -> impl Iterator<Item = usize> {
        self.descriptors.iter().map(ParamDescriptor::slots)
    }

    /// Total length of the flat vector.
    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.shapes().sum()
    }
}
