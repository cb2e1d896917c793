use shared::error::{DecodeError, GraphqlError};
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Coarse classification used by callers that only care whether the remote
/// call itself failed or the payload it returned could not be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    RemoteCallFailed,
    MalformedResponse,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("graphql errors: {}", join_graphql_errors(.0))]
    Graphql(Vec<GraphqlError>),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    #[error("rejected by store: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Malformed(_) => StoreErrorKind::MalformedResponse,
            StoreError::Transport(err) if err.is_decode() => StoreErrorKind::MalformedResponse,
            _ => StoreErrorKind::RemoteCallFailed,
        }
    }
}

impl From<DecodeError> for StoreError {
    fn from(value: DecodeError) -> Self {
        StoreError::Malformed(value.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Malformed(value.to_string())
    }
}

fn join_graphql_errors(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
