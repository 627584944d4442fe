use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api responded {code} for {path}: {body}")]
    Status {
        code: u16,
        path: String,
        body: String,
    },

    #[error("unable to decode api payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}
