//! Target chain configuration
//!
//! Describes the network the dApp expects the wallet to be on, plus everything a
//! wallet needs to register that network when it does not know it yet
//! (`wallet_addEthereumChain`).
//!
//! Environment overrides follow the usual Ethereum tooling conventions:
//!
//! ```bash
//! # Replace the RPC list with a private endpoint
//! export TARGET_RPC_URL="https://bsc-mainnet.nodereal.io/v1/YOUR_KEY"
//!
//! # Replace the block explorer
//! export TARGET_EXPLORER_URL="https://bscscan.com"
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const BSC: u64 = 56;
    pub const BSC_TESTNET: u64 = 97;
}

/// Environment variable names
pub(crate) mod env_vars {
    pub const TARGET_RPC_URL: &str = "TARGET_RPC_URL";
    pub const TARGET_EXPLORER_URL: &str = "TARGET_EXPLORER_URL";
}

/// Public endpoints (rate limited)
pub mod public_rpcs {
    pub const BSC: &str = "https://bsc-dataseed1.binance.org/";
    pub const BSC_TESTNET: &str = "https://data-seed-prebsc-1-s1.binance.org:8545/";
}

/// Native currency of a chain, as wallets expect it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    /// 2-6 characters
    pub symbol: String,
    pub decimals: u8,
}

/// The chain the connected wallet must be on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetChain {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
    pub native_currency: NativeCurrency,
}

impl TargetChain {
    /// BNB Smart Chain mainnet
    pub fn bsc() -> Self {
        Self {
            chain_id: chains::BSC,
            chain_name: "Binance Smart Chain".to_string(),
            rpc_urls: vec![public_rpcs::BSC.to_string()],
            block_explorer_urls: vec!["https://bscscan.com".to_string()],
            native_currency: NativeCurrency {
                name: "BNB".to_string(),
                symbol: "BNB".to_string(),
                decimals: 18,
            },
        }
    }

    /// BNB Smart Chain testnet
    pub fn bsc_testnet() -> Self {
        Self {
            chain_id: chains::BSC_TESTNET,
            chain_name: "Binance Smart Chain Testnet".to_string(),
            rpc_urls: vec![public_rpcs::BSC_TESTNET.to_string()],
            block_explorer_urls: vec!["https://testnet.bscscan.com".to_string()],
            native_currency: NativeCurrency {
                name: "BNB".to_string(),
                symbol: "tBNB".to_string(),
                decimals: 18,
            },
        }
    }

    /// Chain ID as the `0x`-prefixed hex quantity wallets expect
    pub fn hex_chain_id(&self) -> String {
        to_hex_chain_id(self.chain_id)
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(env_vars::TARGET_RPC_URL) {
            tracing::debug!("Using TARGET_RPC_URL for the target chain");
            self.rpc_urls = vec![url];
        }
        if let Some(url) = lookup(env_vars::TARGET_EXPLORER_URL) {
            tracing::debug!("Using TARGET_EXPLORER_URL for the target chain");
            self.block_explorer_urls = vec![url];
        }
    }

    /// Check the fields wallets reject when registering a chain
    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(Error::Config("chain_id must be non-zero".to_string()));
        }
        if self.chain_name.trim().is_empty() {
            return Err(Error::Config("chain_name must not be empty".to_string()));
        }
        if self.rpc_urls.is_empty() {
            return Err(Error::Config(format!(
                "no RPC URL configured for chain {}",
                self.chain_id
            )));
        }
        for raw in self.rpc_urls.iter().chain(&self.block_explorer_urls) {
            url::Url::parse(raw)
                .map_err(|e| Error::Config(format!("invalid URL {}: {}", raw, e)))?;
        }
        let symbol_len = self.native_currency.symbol.chars().count();
        if !(2..=6).contains(&symbol_len) {
            return Err(Error::Config(format!(
                "native currency symbol must be 2-6 characters, got {:?}",
                self.native_currency.symbol
            )));
        }
        Ok(())
    }
}

impl Default for TargetChain {
    fn default() -> Self {
        Self::bsc()
    }
}

/// Format a chain ID as a `0x`-prefixed hex quantity (56 -> "0x38")
pub fn to_hex_chain_id(chain_id: u64) -> String {
    format!("{:#x}", chain_id)
}

/// Display name for well-known chains
pub fn known_chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        chains::ETHEREUM => "Ethereum",
        chains::BSC => "BNB Smart Chain",
        chains::BSC_TESTNET => "BNB Smart Chain Testnet",
        10 => "Optimism",
        137 => "Polygon",
        8453 => "Base",
        42161 => "Arbitrum",
        43114 => "Avalanche",
        11155111 => "Sepolia",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_hex_chain_id() {
        assert_eq!(to_hex_chain_id(56), "0x38");
        assert_eq!(to_hex_chain_id(1), "0x1");
        assert_eq!(TargetChain::bsc().hex_chain_id(), "0x38");
    }

    #[test]
    fn test_defaults_validate() {
        assert!(TargetChain::bsc().validate().is_ok());
        assert!(TargetChain::bsc_testnet().validate().is_ok());
    }

    #[test]
    fn test_symbol_length_enforced() {
        let mut chain = TargetChain::bsc();
        chain.native_currency.symbol = "B".to_string();
        assert!(chain.validate().is_err());

        chain.native_currency.symbol = "BNBBNBB".to_string();
        assert!(chain.validate().is_err());
    }

    #[test]
    fn test_rejects_missing_rpc_and_bad_urls() {
        let mut chain = TargetChain::bsc();
        chain.rpc_urls.clear();
        assert!(chain.validate().is_err());

        let mut chain = TargetChain::bsc();
        chain.block_explorer_urls = vec!["not a url".to_string()];
        assert!(chain.validate().is_err());
    }

    #[test]
    fn test_overrides_replace_lists() {
        let vars: HashMap<&str, &str> = [
            (env_vars::TARGET_RPC_URL, "https://private.rpc"),
            (env_vars::TARGET_EXPLORER_URL, "https://explorer.example"),
        ]
        .into_iter()
        .collect();

        let mut chain = TargetChain::bsc();
        chain.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(chain.rpc_urls, vec!["https://private.rpc".to_string()]);
        assert_eq!(
            chain.block_explorer_urls,
            vec!["https://explorer.example".to_string()]
        );
    }
}
