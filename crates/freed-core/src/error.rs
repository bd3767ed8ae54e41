use freed_db::StoreError;
use thiserror::Error;

/// Why a watched page could not be read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out")]
    Timeout,
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("http status {0}")]
    Status(u16),
}

/// Why an email could not be handed to the transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("bad address {0:?}")]
    Address(String),
    #[error("could not build message: {0}")]
    Build(String),
    #[error("transport: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("page could not be fetched: {0}")]
    Unreachable(FetchError),
    #[error("could not allocate a free feed id")]
    IdExhausted,
    #[error(transparent)]
    Store(#[from] StoreError),
}
