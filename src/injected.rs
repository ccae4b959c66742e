//! Injected browser wallet chain management
//!
//! Typed `wallet_switchEthereumChain` / `wallet_addEthereumChain` requests
//! (EIP-3326, EIP-3085) over an optional injected EIP-1193 provider.

use crate::config::{NativeCurrency, TargetChain};
use crate::provider::{Eip1193, ProviderRpcError, RawConnection};
use serde::Serialize;
use serde_json::Value;

/// `wallet_switchEthereumChain` parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchEthereumChainParameter {
    pub chain_id: String,
}

/// `wallet_addEthereumChain` parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEthereumChainParameter {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
    pub native_currency: NativeCurrency,
}

impl From<&TargetChain> for AddEthereumChainParameter {
    fn from(chain: &TargetChain) -> Self {
        Self {
            chain_id: chain.hex_chain_id(),
            chain_name: chain.chain_name.clone(),
            rpc_urls: chain.rpc_urls.clone(),
            block_explorer_urls: chain.block_explorer_urls.clone(),
            native_currency: chain.native_currency.clone(),
        }
    }
}

/// Chain-management requests understood by injected wallets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletRequest {
    SwitchEthereumChain(SwitchEthereumChainParameter),
    AddEthereumChain(AddEthereumChainParameter),
}

impl WalletRequest {
    pub fn method(&self) -> &'static str {
        match self {
            WalletRequest::SwitchEthereumChain(_) => "wallet_switchEthereumChain",
            WalletRequest::AddEthereumChain(_) => "wallet_addEthereumChain",
        }
    }

    /// Params array: a single parameter object
    pub fn params(&self) -> Result<Value, serde_json::Error> {
        let param = match self {
            WalletRequest::SwitchEthereumChain(p) => serde_json::to_value(p)?,
            WalletRequest::AddEthereumChain(p) => serde_json::to_value(p)?,
        };
        Ok(Value::Array(vec![param]))
    }
}

/// How a mismatched chain was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSwitch {
    /// The wallet knew the chain and switched to it
    Switched,
    /// The wallet did not know the chain; it was registered
    Added,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainSwitchError {
    #[error("wallet_switchEthereumChain failed: {0}")]
    Switch(ProviderRpcError),

    #[error("wallet_addEthereumChain failed: {0}")]
    Add(ProviderRpcError),
}

/// Browser-injected wallet (`window.ethereum`)
pub struct InjectedWallet {
    connection: RawConnection,
}

impl InjectedWallet {
    pub fn new(connection: RawConnection) -> Self {
        Self { connection }
    }

    pub async fn request(&self, request: &WalletRequest) -> Result<Value, ProviderRpcError> {
        let params = request.params().map_err(|e| {
            ProviderRpcError::new(
                ProviderRpcError::INTERNAL,
                format!("cannot encode {} params: {}", request.method(), e),
            )
        })?;
        self.connection.request(request.method(), params).await
    }

    /// Ask the wallet to move to `chain`; register it first if unknown
    ///
    /// Only [`ProviderRpcError::UNRECOGNIZED_CHAIN`] triggers registration. Any
    /// other switch error is returned as-is.
    pub async fn ensure_chain(&self, chain: &TargetChain) -> Result<ChainSwitch, ChainSwitchError> {
        let switch = WalletRequest::SwitchEthereumChain(SwitchEthereumChainParameter {
            chain_id: chain.hex_chain_id(),
        });

        match self.request(&switch).await {
            Ok(_) => {
                tracing::info!(chain_id = chain.chain_id, "Wallet switched chain");
                Ok(ChainSwitch::Switched)
            }
            Err(e) if e.is_unrecognized_chain() => {
                tracing::info!(
                    chain_id = chain.chain_id,
                    chain_name = %chain.chain_name,
                    "Wallet does not know the chain, requesting registration"
                );
                let add = WalletRequest::AddEthereumChain(chain.into());
                self.request(&add).await.map_err(ChainSwitchError::Add)?;
                Ok(ChainSwitch::Added)
            }
            Err(e) => Err(ChainSwitchError::Switch(e)),
        }
    }
}

impl std::fmt::Debug for InjectedWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectedWallet").finish_non_exhaustive()
    }
}
