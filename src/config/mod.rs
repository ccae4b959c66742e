//! Configuration for the wallet connector

pub mod chain;

use crate::{Error, Result};
use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use chain::{NativeCurrency, TargetChain};

/// WalletConnect gateway (Infura project) ID environment variable name
pub const WALLETCONNECT_GATEWAY_ID_ENV: &str = "WALLETCONNECT_GATEWAY_ID";

/// Contract address environment variable name
pub const CONTRACT_ADDRESS_ENV: &str = "CONTRACT_ADDRESS";

/// Options for the remote-session (WalletConnect) connection method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConnectConfig {
    /// Gateway identifier used by the bridge to reach a node
    #[serde(default)]
    pub gateway_id: String,
    /// RPC endpoints for chains the session may land on, keyed by chain ID
    #[serde(default)]
    pub rpc: BTreeMap<u64, String>,
}

impl Default for WalletConnectConfig {
    fn default() -> Self {
        let mut rpc = BTreeMap::new();
        rpc.insert(chain::chains::BSC, chain::public_rpcs::BSC.to_string());
        Self {
            gateway_id: String::new(),
            rpc,
        }
    }
}

/// Wallet selector settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Network name handed to the selector
    pub network: String,
    /// Remember the chosen connection method across sessions
    pub cache_provider: bool,
    #[serde(default)]
    pub walletconnect: WalletConnectConfig,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            network: "mainnet".to_string(),
            cache_provider: true,
            walletconnect: WalletConnectConfig::default(),
        }
    }
}

/// The contract bound to the signer after a successful connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractConfig {
    pub address: Address,
    /// Inline ABI; ignored when `abi_path` is set
    #[serde(default)]
    pub abi: JsonAbi,
    /// ABI file: either a bare ABI array or a build artifact with an `abi` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi_path: Option<PathBuf>,
}

impl ContractConfig {
    /// Resolve the ABI, reading `abi_path` when configured
    pub fn load_abi(&self) -> Result<JsonAbi> {
        let Some(path) = &self.abi_path else {
            return Ok(self.abi.clone());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read ABI {}: {}", path.display(), e))
        })?;
        parse_abi(&content)
    }
}

/// Parse an ABI from a bare JSON array or an artifact object with an `abi` field
pub fn parse_abi(content: &str) -> Result<JsonAbi> {
    let mut value: serde_json::Value = serde_json::from_str(content)?;
    if let Some(abi) = value.get_mut("abi") {
        value = abi.take();
    }
    serde_json::from_value(value).map_err(|e| Error::Config(format!("invalid ABI: {}", e)))
}

/// User-facing alert texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessages {
    /// Shown when the wallet is on the wrong chain and cannot be switched for the user
    pub switch_network: String,
    /// Shown for every connection failure, whatever the cause
    pub wallet_connect_error: String,
}

impl Default for AlertMessages {
    fn default() -> Self {
        Self {
            switch_network: "Please switch your wallet to Binance Smart Chain.".to_string(),
            wallet_connect_error: "Wallet connection failed.".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Chain the wallet must be on
    #[serde(default)]
    pub chain: TargetChain,
    /// Wallet selector settings
    #[serde(default)]
    pub selector: SelectorConfig,
    /// Contract bound after connecting
    #[serde(default)]
    pub contract: ContractConfig,
    /// Alert texts
    #[serde(default)]
    pub messages: AlertMessages,
}

impl WalletConfig {
    /// Load from a JSON file (or defaults), apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.chain.apply_overrides(&lookup);

        if let Some(id) = lookup(WALLETCONNECT_GATEWAY_ID_ENV) {
            tracing::debug!("Using WALLETCONNECT_GATEWAY_ID for the remote-session method");
            self.selector.walletconnect.gateway_id = id;
        }

        if let Some(address) = lookup(CONTRACT_ADDRESS_ENV) {
            self.contract.address = address.parse().map_err(|e| {
                Error::Config(format!("invalid {}: {}", CONTRACT_ADDRESS_ENV, e))
            })?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.chain.validate()?;

        if self.selector.network.trim().is_empty() {
            return Err(Error::Config("selector network must not be empty".to_string()));
        }
        for (chain_id, raw) in &self.selector.walletconnect.rpc {
            url::Url::parse(raw).map_err(|e| {
                Error::Config(format!("invalid walletconnect RPC for chain {}: {}", chain_id, e))
            })?;
        }
        if self.selector.walletconnect.gateway_id.is_empty() {
            tracing::warn!(
                "No {} configured; remote-session connections may fail",
                WALLETCONNECT_GATEWAY_ID_ENV
            );
        }
        if self.contract.address == Address::ZERO {
            tracing::warn!("Contract address is the zero address");
        }

        Ok(())
    }
}
