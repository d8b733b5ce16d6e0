use crate::types::Field;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading tables or building a single report.
#[derive(Error, Debug)]
pub enum StatError {
    #[error("input file {} does not appear to exist", .0.display())]
    MissingInput(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed collection date {raw:?} on sample {sample}")]
    MalformedDate { sample: String, raw: String },

    #[error("unsupported granularity {0:?} (expected month, day or week)")]
    UnsupportedGranularity(String),

    #[error("unknown field {0:?}")]
    UnknownField(String),

    #[error("{table} rows have no {field} column")]
    FieldNotInSource { field: Field, table: &'static str },

    #[error("period {period} is outside the axis {first}..{last}")]
    PeriodOutsideAxis {
        period: String,
        first: String,
        last: String,
    },
}

pub type Result<T> = std::result::Result<T, StatError>;
