//! Error taxonomy for record, import and export operations
//!
//! Every variant maps onto an HTTP-style status class so callers can decide
//! how to surface it:
//! - 400: unreadable files, header drift, empty exports, invalid field maps
//! - 404: unknown record ids
//! - 500: store or spreadsheet-writer failures

use thiserror::Error;

use crate::entity::EntityKind;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot read spreadsheet: {0}")]
    Format(String),

    #[error("header mismatch for {kind}: expected {expected:?}, found {observed:?}")]
    SchemaMismatch {
        kind: EntityKind,
        expected: Vec<String>,
        observed: Vec<String>,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("nothing to export: {kind} table is empty")]
    NoData { kind: EntityKind },

    #[error("{kind} requires a non-blank `{field}`")]
    MissingNaturalKey {
        kind: EntityKind,
        field: &'static str,
    },

    #[error("{kind} has no writable field `{field}`")]
    UnknownField { kind: EntityKind, field: String },

    #[error("import rejected: {what} is {actual}, limit is {limit}")]
    TooLarge {
        what: &'static str,
        actual: u64,
        limit: u64,
    },

    #[error("record store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("failed to write spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}

impl EngineError {
    /// HTTP-style status class for this error
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::NotFound { .. } => 404,
            EngineError::Store(_) | EngineError::Spreadsheet(_) => 500,
            _ => 400,
        }
    }

    /// Message safe to show to an end user (no internal detail)
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Format(_) => "cannot read the file, please check it is an .xlsx spreadsheet".to_string(),
            EngineError::SchemaMismatch { .. } => "spreadsheet header does not match the expected columns".to_string(),
            EngineError::NotFound { kind, .. } => format!("{} does not exist", kind.display_name()),
            EngineError::NoData { .. } => "nothing to export".to_string(),
            EngineError::MissingNaturalKey { field, .. } => format!("`{}` is required", field),
            EngineError::UnknownField { field, .. } => format!("unknown field `{}`", field),
            EngineError::TooLarge { .. } => "file is too large to import".to_string(),
            EngineError::Store(_) | EngineError::Spreadsheet(_) => "internal error".to_string(),
        }
    }
}
