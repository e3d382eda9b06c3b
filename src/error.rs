use thiserror::Error;

use crate::models::Entity;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Could not read import source: {0}")]
    Parse(String),

    #[error("The uploaded file is empty")]
    EmptyInput,

    #[error("No {entity} with id {id}")]
    NotFound { entity: Entity, id: i64 },

    #[error("Store error: {0}")]
    Remote(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Auth(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("PDF error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
