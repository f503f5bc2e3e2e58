//! Evaluation parameters shared between the tuner and the evaluation oracle.
//!
//! The oracle reads its numeric parameters from a JSON *configuration artifact*: an object
//! mapping every parameter name to either an integer or an array of integers. The optimizer,
//! on the other hand, only ever sees a single flat `f64` vector covering the parameters that
//! are being tuned. This crate owns both representations and the lossless mapping between them.
//!
//! # Architecture
//!
//! ```text
//! ParamSet (configuration artifact, all parameters, integers)
//!     ↓ ParamSchema::resolve (validated against TuneSpec)
//! ParamSchema (sorted descriptors: Scalar | Table | SymmetricTable)
//!     ↓ ParamCodec::select + ParamCodec::flatten
//! Flat vector (tunable parameters only, f64, symmetric tables halved)
//!     ↓ ParamCodec::unflatten_and_emit
//! ParamSet (full artifact again, symmetric tables mirrored)
//! ```
//!
//! # Symmetric Tables
//!
//! Piece-square style tables are stored as rows of 8 values and are expected to be left-right
//! mirror images. Only the left half of each row is exposed to the optimizer, so a symmetric
//! table of 64 entries occupies 32 slots in the flat vector. The halves are mirrored back out
//! when the artifact is emitted, so the oracle always receives full rows.
//!
//! # Modules
//!
//! - [`param_set`]: the configuration artifact model ([`ParamSet`], [`ParamValue`])
//! - [`schema`]: tunable parameter descriptors and their validation
//! - [`codec`]: flatten/unflatten between [`ParamSet`] and the flat vector
//! - [`file`]: JSON file helpers shared by the artifact and the tuning spec
//!
//! # Example
//!
//! ```
//! use acetune_params::{ParamCodec, ParamSet, ParamValue, SymmetryPolicy, TuneSpec};
//!
//! let mut base = ParamSet::new();
//! base.insert("pawn_row", ParamValue::Table(vec![1, 2, 3, 4, 4, 3, 2, 1]));
//! base.insert("tempo", ParamValue::Scalar(10));
//!
//! let spec = TuneSpec {
//!     tune: vec!["pawn_row".to_owned(), "tempo".to_owned()],
//!     symmetric: vec!["pawn_row".to_owned()],
//! };
//! let codec = ParamCodec::new(base, &spec, SymmetryPolicy::Strict).unwrap();
//!
//! let flat = codec.initial_vector().unwrap();
//! assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0, 10.0]);
//!
//! let emitted = codec.unflatten_and_emit(&flat).unwrap();
//! assert_eq!(
//!     emitted.get("pawn_row"),
//!     Some(&ParamValue::Table(vec![1, 2, 3, 4, 4, 3, 2, 1]))
//! );
//! ```

pub use self::{codec::*, file::FileError, param_set::*, schema::*};

pub mod codec;
pub mod file;
pub mod param_set;
pub mod schema;
