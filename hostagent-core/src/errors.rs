use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid cid ({0})")]
    InvalidCid(String),

    #[error("invalid broker id ({0})")]
    InvalidBrokerId(String),

    #[error("invalid metric filter: {0}")]
    InvalidFilter(String),
}
