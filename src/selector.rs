//! Wallet selector seam
//!
//! A selector presents the available connection methods, lets the user pick
//! one, and hands back the raw EIP-1193 connection. The connector builds a
//! fresh selector per `connect()` from [`SelectorOptions`].

use crate::config::WalletConfig;
use crate::provider::{HttpTransport, RawConnection};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Method name of the remote-session connection method
pub const WALLETCONNECT: &str = "walletconnect";

/// Options for the remote-session (WalletConnect) method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConnectOptions {
    /// Gateway (Infura) identifier
    pub gateway_id: String,
    /// Auxiliary chain ID -> RPC URL
    pub rpc: BTreeMap<u64, String>,
    /// Chain the session should start on
    pub chain_id: u64,
}

/// A supported connection method and its options
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "package", content = "options", rename_all = "lowercase")]
pub enum ProviderOption {
    WalletConnect(WalletConnectOptions),
}

/// Everything a selector needs to be built
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorOptions {
    pub network: String,
    pub cache_provider: bool,
    /// Connection methods keyed by method name
    pub provider_options: BTreeMap<String, ProviderOption>,
}

impl SelectorOptions {
    pub fn from_config(config: &WalletConfig) -> Self {
        let walletconnect = WalletConnectOptions {
            gateway_id: config.selector.walletconnect.gateway_id.clone(),
            rpc: config.selector.walletconnect.rpc.clone(),
            chain_id: config.chain.chain_id,
        };

        let mut provider_options = BTreeMap::new();
        provider_options.insert(
            WALLETCONNECT.to_string(),
            ProviderOption::WalletConnect(walletconnect),
        );

        Self {
            network: config.selector.network.clone(),
            cache_provider: config.selector.cache_provider,
            provider_options,
        }
    }

    /// Options of the remote-session method, if registered
    pub fn walletconnect(&self) -> Option<&WalletConnectOptions> {
        match self.provider_options.get(WALLETCONNECT)? {
            ProviderOption::WalletConnect(options) => Some(options),
        }
    }
}

/// An opened wallet picker
#[async_trait]
pub trait WalletSelector: Send + Sync {
    /// Prompt the user and wait for a connection
    async fn connect(&self) -> Result<RawConnection>;

    /// Show or hide the picker UI
    async fn toggle_modal(&self) -> Result<()>;
}

/// Builds selectors; owns whatever survives between connections
#[async_trait]
pub trait SelectorFactory: Send + Sync {
    async fn build(&self, options: SelectorOptions) -> Result<Box<dyn WalletSelector>>;

    /// Forget the remembered connection method
    async fn clear_cached_provider(&self) -> Result<()> {
        Ok(())
    }
}

/// Selector with a single choice: a JSON-RPC endpoint
///
/// Used by the CLI and for local nodes (anvil, hardhat) that expose unlocked
/// accounts over `eth_accounts`.
#[derive(Debug)]
pub struct JsonRpcSelectorFactory {
    endpoint: String,
    cached: Arc<Mutex<Option<String>>>,
}

impl JsonRpcSelectorFactory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Endpoint remembered by the last connection made with `cache_provider`
    pub fn cached_provider(&self) -> Option<String> {
        self.cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl SelectorFactory for JsonRpcSelectorFactory {
    async fn build(&self, options: SelectorOptions) -> Result<Box<dyn WalletSelector>> {
        tracing::debug!(
            network = %options.network,
            cache_provider = options.cache_provider,
            methods = ?options.provider_options.keys().collect::<Vec<_>>(),
            "Building JSON-RPC selector"
        );
        Ok(Box::new(JsonRpcSelector {
            endpoint: self.endpoint.clone(),
            cache: options.cache_provider.then(|| self.cached.clone()),
        }))
    }

    async fn clear_cached_provider(&self) -> Result<()> {
        *self
            .cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

struct JsonRpcSelector {
    endpoint: String,
    cache: Option<Arc<Mutex<Option<String>>>>,
}

#[async_trait]
impl WalletSelector for JsonRpcSelector {
    async fn connect(&self) -> Result<RawConnection> {
        let transport = HttpTransport::from_url(&self.endpoint)
            .map_err(|e| Error::Selector(e.to_string()))?;
        if let Some(cache) = &self.cache {
            *cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
                Some(self.endpoint.clone());
        }
        tracing::info!(endpoint = %self.endpoint, "Connected via JSON-RPC endpoint");
        Ok(Arc::new(transport))
    }

    async fn toggle_modal(&self) -> Result<()> {
        Ok(())
    }
}
