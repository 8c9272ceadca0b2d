use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown sanctions list: {0}")]
    UnknownList(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScreeningError {
    #[error("query is empty; enter a name to screen")]
    EmptyQuery,

    #[error("threshold {0} is outside 0..=100")]
    InvalidThreshold(u8),

    #[error("candidate limit must be at least 1")]
    InvalidLimit,
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
