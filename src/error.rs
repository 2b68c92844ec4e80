use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::ScenarioId;

// ---------------------------------------------------------------------------
// Library error type
// ---------------------------------------------------------------------------

/// Everything that can go wrong while building a [`ScenarioDataset`].
///
/// Parsing anomalies inside a file (unparseable numbers, out-of-range ids)
/// are absorbed by the loader and never show up here.
///
/// [`ScenarioDataset`]: crate::data::dataset::ScenarioDataset
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("no scenarios given")]
    NoScenarios,

    #[error("no {kind} file for scenario {scenario}")]
    MissingScenarioFile { kind: &'static str, scenario: ScenarioId },

    /// Summed POD area is not strictly positive; capacities cannot be scaled.
    #[error("total area for PODs is {total}; PODs need valid area values")]
    ZeroPodArea { total: f64 },

    #[error("tau search range is empty")]
    EmptyTauRange,

    #[error("unknown sampling method '{0}' (expected LHS or MC)")]
    UnknownMethod(String),

    #[error("invalid run configuration: {0}")]
    Config(String),
}

pub type Result<T, E = DataError> = std::result::Result<T, E>;
