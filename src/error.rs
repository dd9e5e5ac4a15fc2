use thiserror::Error;

/// Errors raised while loading, aggregating or generating grade data.
#[derive(Error, Debug)]
pub enum GradeError {
    /// A column the pipeline needs is not present in the input.
    #[error("missing required column {column}")]
    Schema { column: String },

    /// A cell could not be used in a computation.
    #[error("row {row}: {column} {reason}")]
    Computation {
        row: usize,
        column: String,
        reason: String,
    },

    /// The generator has no assignment list for this subject.
    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    #[error("Failed to process CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GradeError>;

impl GradeError {
    pub fn schema(column: &str) -> Self {
        GradeError::Schema {
            column: column.to_string(),
        }
    }

    pub fn computation(row: usize, column: &str, reason: impl Into<String>) -> Self {
        GradeError::Computation {
            row,
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}
