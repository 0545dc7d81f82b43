use shared::error::ApiException;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure of an [`ImageStore`](crate::ImageStore) operation. Always distinct
/// from a successful empty result.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("image service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("image service returned {status}: {source}")]
    Api {
        status: u16,
        #[source]
        source: ApiException,
    },
    #[error("image service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("image store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid image service endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("upload rejected: {0}")]
    Rejected(String),
}
