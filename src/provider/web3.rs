//! Primary provider: network descriptor and signer derivation

use super::{parse_accounts, Eip1193, JsonRpcSigner, ProviderRpcError, RawConnection};
use crate::config::chain::known_chain_name;
use alloy::primitives::{Address, U64};
use serde_json::{json, Value};
use std::sync::Arc;

/// Network the connection is currently on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub chain_id: u64,
    pub name: String,
}

/// Provider wrapping a raw wallet connection
pub struct Web3Provider {
    connection: RawConnection,
}

impl Web3Provider {
    pub fn new(connection: RawConnection) -> Self {
        Self { connection }
    }

    /// The underlying connection
    pub fn connection(&self) -> &RawConnection {
        &self.connection
    }

    /// Forward a raw request to the connection
    pub async fn send(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        self.connection.request(method, params).await
    }

    /// Read the chain the wallet is on
    pub async fn get_network(&self) -> Result<Network, ProviderRpcError> {
        let value = self.send("eth_chainId", json!([])).await?;
        let chain_id = serde_json::from_value::<U64>(value.clone())
            .map_err(|_| ProviderRpcError::invalid_response("eth_chainId", &value))?
            .to::<u64>();

        Ok(Network {
            chain_id,
            name: known_chain_name(chain_id).to_string(),
        })
    }

    /// Accounts the wallet exposes to this dApp
    pub async fn list_accounts(&self) -> Result<Vec<Address>, ProviderRpcError> {
        let value = self.send("eth_accounts", json!([])).await?;
        parse_accounts("eth_accounts", value)
    }

    /// Signer for the first exposed account, sharing this provider
    pub async fn get_signer(self: Arc<Self>) -> Result<JsonRpcSigner, ProviderRpcError> {
        let address = self
            .list_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ProviderRpcError::new(
                    ProviderRpcError::UNAUTHORIZED,
                    "wallet exposed no accounts",
                )
            })?;

        Ok(JsonRpcSigner::new(self, address))
    }
}

impl std::fmt::Debug for Web3Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Web3Provider").finish_non_exhaustive()
    }
}
