// src/utils/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Could not determine category: no .secondarytitle heading in document")]
    CategoryNotFound,

    #[error("Could not determine category from heading: {0:?}")]
    CategoryMismatch(String),

    #[error("Expected result for {model} has no answer text")]
    MissingAnswerText { model: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
