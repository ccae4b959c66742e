//! EIP-1193 provider layer
//!
//! Everything a wallet hands back (a WalletConnect session, an injected browser
//! wallet, a plain JSON-RPC node) is reduced to one `request(method, params)`
//! interface. The provider, account listing and signer are built on top of it.

mod http;
mod legacy;
mod signer;
mod web3;

pub use http::HttpTransport;
pub use legacy::AccountsProvider;
pub use signer::JsonRpcSigner;
pub use web3::{Network, Web3Provider};

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Error returned by an EIP-1193 `request`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    /// Returned by `wallet_switchEthereumChain` when the wallet does not know the chain
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const INTERNAL: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Response did not have the expected shape
    pub fn invalid_response(method: &str, value: &Value) -> Self {
        Self::new(
            Self::INTERNAL,
            format!("unexpected {} response: {}", method, value),
        )
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == Self::UNRECOGNIZED_CHAIN
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Self::USER_REJECTED
    }
}

/// Minimal EIP-1193 provider: `request({ method, params })`
#[async_trait]
pub trait Eip1193: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;
}

/// Raw connection handed back by a wallet selector
pub type RawConnection = Arc<dyn Eip1193>;

/// Decode an `eth_accounts` style response
pub(crate) fn parse_accounts(method: &str, value: Value) -> Result<Vec<Address>, ProviderRpcError> {
    serde_json::from_value(value.clone())
        .map_err(|_| ProviderRpcError::invalid_response(method, &value))
}
