use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("parsed document not found: {0:?}")]
    MissingInput(PathBuf),
    #[error("invalid parsed document: {0}")]
    InvalidDocument(&'static str),
}

pub type Result<T> = std::result::Result<T, CoreError>;
