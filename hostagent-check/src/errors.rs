use hostagent_api::ApiError;
use hostagent_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckError>;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("check bundle not initialized")]
    Uninitialized,

    #[error("check bundle ({cid}) not active (checks: {checks:?}, status: {status})")]
    NotActive {
        cid: String,
        checks: Vec<String>,
        status: String,
    },

    #[error("no active check bundle of type ({check_type}) found for target ({target})")]
    NotFound { check_type: String, target: String },

    #[error(
        "multiple check bundles ({count}) of type ({check_type}) found for target ({target}), set an explicit check bundle id"
    )]
    Ambiguous {
        count: usize,
        check_type: String,
        target: String,
    },

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("invalid target (empty)")]
    EmptyTarget,

    #[error("no brokers available")]
    NoBrokers,

    #[error("found {considered} broker(s), 0 valid")]
    NoValidBroker { considered: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Api {
        context: String,
        #[source]
        source: ApiError,
    },

    #[error("metric state ({}): {reason}", .path.display())]
    State { path: PathBuf, reason: String },
}

impl CheckError {
    pub(crate) fn api(context: impl Into<String>, source: ApiError) -> Self {
        CheckError::Api {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn state(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CheckError::State {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
