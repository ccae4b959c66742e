//! Error types for the wallet connector

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Wallet selector error: {0}")]
    Selector(String),

    #[error("Provider error: {0}")]
    Provider(#[from] crate::provider::ProviderRpcError),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
