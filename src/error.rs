use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Column '{name}' not found")]
    ColumnNotFound { name: String },

    #[error("Column '{column}' expects {expected} values, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Column '{column}' has {found} rows, table has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Pivot collision: duplicate value for index ({index}) and variable '{variable}'")]
    PivotCollision { index: String, variable: String },

    #[error("Name split failed: '{name}' does not split into two parts on '{separator}'")]
    NameSplitArity { name: String, separator: String },

    #[error("Join error: {0}")]
    Join(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
