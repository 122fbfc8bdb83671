//! Error types for the parsing layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("grammar load failed for {language}: {reason}")]
    GrammarLoad { language: String, reason: String },

    #[error("parse failed for {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ParseError>;
