//! Connection orchestrator
//!
//! Drives the connect/disconnect lifecycle against a [`WalletStore`]:
//!
//! 1. Build a selector and let the user pick a wallet
//! 2. Derive provider, accounts and network from the raw connection
//! 3. On the target chain: derive signer + contract and commit all four fields
//! 4. On another chain: ask the injected wallet to switch (or register the
//!    chain), or tell the user to switch themselves
//!
//! Any failure resets the store and raises the same generic alert. The cause is
//! logged and handed back in [`ConnectOutcome::Failed`].

use crate::alert::{Alert, AlertSink};
use crate::config::WalletConfig;
use crate::contract::ContractBinding;
use crate::injected::{ChainSwitch, ChainSwitchError, InjectedWallet};
use crate::provider::{AccountsProvider, ProviderRpcError, RawConnection, Web3Provider};
use crate::selector::{SelectorFactory, SelectorOptions};
use crate::store::WalletStore;
use crate::Error;
use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Why a connection attempt failed
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("wallet selector failed: {0}")]
    Selector(#[source] Error),

    #[error("provider request failed: {0}")]
    Provider(#[from] ProviderRpcError),

    #[error("wallet exposed no accounts")]
    NoAccounts,

    #[error(transparent)]
    Chain(#[from] ChainSwitchError),
}

/// Result of a `connect()` call
#[derive(Debug)]
pub enum ConnectOutcome {
    /// Store populated
    Connected { account: Address, chain_id: u64 },
    /// Wallet was on `from`; it switched to the target chain
    ChainSwitched { from: u64 },
    /// Wallet was on `from`; the target chain was registered with it
    ChainAdded { from: u64 },
    /// Wallet was on `from` and no injected wallet could switch it
    SwitchPrompted { from: u64 },
    /// Store reset, error alert raised
    Failed(ConnectError),
    /// Another `connect()` is still running
    Busy,
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectOutcome::Connected { .. })
    }
}

/// Clears the in-flight flag when the attempt ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Connects wallets and keeps the store in sync
pub struct WalletConnector {
    config: Arc<WalletConfig>,
    abi: Arc<JsonAbi>,
    store: WalletStore,
    selectors: Arc<dyn SelectorFactory>,
    injected: Option<InjectedWallet>,
    alerts: Arc<dyn AlertSink>,
    in_flight: AtomicBool,
}

impl WalletConnector {
    /// Create a connector; resolves the contract ABI up front
    pub fn new(
        config: WalletConfig,
        store: WalletStore,
        selectors: Arc<dyn SelectorFactory>,
        alerts: Arc<dyn AlertSink>,
    ) -> crate::Result<Self> {
        let abi = Arc::new(config.contract.load_abi()?);
        Ok(Self {
            config: Arc::new(config),
            abi,
            store,
            selectors,
            injected: None,
            alerts,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Attach the browser-injected wallet used for chain switching
    pub fn with_injected(mut self, connection: RawConnection) -> Self {
        self.injected = Some(InjectedWallet::new(connection));
        self
    }

    pub fn store(&self) -> &WalletStore {
        &self.store
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// A `connect()` is currently running
    pub fn is_connecting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Connect a wallet and populate the store
    ///
    /// Never fails: errors reset the store, raise one error alert, and come back
    /// as [`ConnectOutcome::Failed`].
    pub async fn connect(&self) -> ConnectOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            warn!("connect() called while another connection attempt is running");
            return ConnectOutcome::Busy;
        };

        let span = tracing::info_span!("connect", attempt = %Uuid::new_v4());
        async {
            match self.try_connect().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Wallet connection failed");
                    self.reset();
                    self.alerts
                        .open_alert(Alert::error(self.config.messages.wallet_connect_error.clone()));
                    ConnectOutcome::Failed(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Reset the store to the disconnected state
    pub async fn disconnect(&self) {
        self.reset();
        info!("Wallet disconnected");

        if self.config.selector.cache_provider {
            if let Err(e) = self.selectors.clear_cached_provider().await {
                warn!(error = %e, "Failed to clear cached wallet provider");
            }
        }
    }

    async fn try_connect(&self) -> Result<ConnectOutcome, ConnectError> {
        let target = &self.config.chain;

        let selector = self
            .selectors
            .build(SelectorOptions::from_config(&self.config))
            .await
            .map_err(ConnectError::Selector)?;
        let connection = selector.connect().await.map_err(ConnectError::Selector)?;
        let provider = Arc::new(Web3Provider::new(connection.clone()));
        selector.toggle_modal().await.map_err(ConnectError::Selector)?;

        let accounts = AccountsProvider::new(connection).get_accounts().await?;
        let network = provider.get_network().await?;
        info!(
            chain_id = network.chain_id,
            network = %network.name,
            accounts = accounts.len(),
            "Wallet connected"
        );

        if network.chain_id == target.chain_id {
            let signer = provider.clone().get_signer().await?;
            let contract =
                ContractBinding::new(self.config.contract.address, self.abi.clone(), signer.clone());
            let account = accounts.first().copied().ok_or(ConnectError::NoAccounts)?;

            self.store.set_account(Some(account));
            self.store.set_provider(Some(provider));
            self.store.set_contract(Some(contract));
            self.store.set_signer(Some(signer));

            info!(account = %account, contract = %self.config.contract.address, "Wallet ready");
            return Ok(ConnectOutcome::Connected {
                account,
                chain_id: network.chain_id,
            });
        }

        warn!(
            expected = target.chain_id,
            actual = network.chain_id,
            "Wallet is on the wrong chain"
        );

        let Some(injected) = &self.injected else {
            self.alerts
                .open_alert(Alert::warning(self.config.messages.switch_network.clone()));
            return Ok(ConnectOutcome::SwitchPrompted {
                from: network.chain_id,
            });
        };

        // The store is left as is; the next connect() picks up the new chain
        Ok(match injected.ensure_chain(target).await? {
            ChainSwitch::Switched => ConnectOutcome::ChainSwitched {
                from: network.chain_id,
            },
            ChainSwitch::Added => ConnectOutcome::ChainAdded {
                from: network.chain_id,
            },
        })
    }

    fn reset(&self) {
        self.store.set_account(None);
        self.store.set_provider(None);
        self.store.set_contract(None);
        self.store.set_signer(None);
    }
}

impl std::fmt::Debug for WalletConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConnector")
            .field("chain_id", &self.config.chain.chain_id)
            .field("injected", &self.injected.is_some())
            .field("connecting", &self.is_connecting())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Severity;
    use crate::config::parse_abi;
    use crate::provider::testing::ScriptedConnection;
    use crate::selector::WalletSelector;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    const TOKEN_ABI: &str = r#"[
        {"type":"function","name":"balanceOf","stateMutability":"view",
         "inputs":[{"name":"owner","type":"address"}],
         "outputs":[{"name":"","type":"uint256"}]}
    ]"#;

    fn account() -> Address {
        "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
    }

    fn other_account() -> Address {
        "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap()
    }

    #[derive(Default)]
    struct RecordingAlerts(Mutex<Vec<Alert>>);

    impl RecordingAlerts {
        fn take(&self) -> Vec<Alert> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl AlertSink for RecordingAlerts {
        fn open_alert(&self, alert: Alert) {
            self.0.lock().unwrap().push(alert);
        }
    }

    /// Selector yielding a fixed connection, or failing when there is none
    #[derive(Default)]
    struct FakeSelectors {
        connection: Option<RawConnection>,
        built: Mutex<Vec<SelectorOptions>>,
        toggles: Arc<AtomicUsize>,
        cleared: AtomicUsize,
        started: Option<Arc<Notify>>,
        release: Option<Arc<Notify>>,
        fail_toggle: bool,
    }

    impl FakeSelectors {
        fn with(connection: Arc<ScriptedConnection>) -> Self {
            Self {
                connection: Some(connection),
                ..Default::default()
            }
        }
    }

    struct FakeSelector {
        connection: Option<RawConnection>,
        toggles: Arc<AtomicUsize>,
        started: Option<Arc<Notify>>,
        release: Option<Arc<Notify>>,
        fail_toggle: bool,
    }

    #[async_trait]
    impl WalletSelector for FakeSelector {
        async fn connect(&self) -> crate::Result<RawConnection> {
            if let (Some(started), Some(release)) = (&self.started, &self.release) {
                started.notify_one();
                release.notified().await;
            }
            self.connection
                .clone()
                .ok_or_else(|| Error::Selector("Modal closed by user".to_string()))
        }

        async fn toggle_modal(&self) -> crate::Result<()> {
            self.toggles.fetch_add(1, Ordering::SeqCst);
            if self.fail_toggle {
                return Err(Error::Selector("Modal could not be closed".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SelectorFactory for FakeSelectors {
        async fn build(&self, options: SelectorOptions) -> crate::Result<Box<dyn WalletSelector>> {
            self.built.lock().unwrap().push(options);
            Ok(Box::new(FakeSelector {
                connection: self.connection.clone(),
                toggles: self.toggles.clone(),
                started: self.started.clone(),
                release: self.release.clone(),
                fail_toggle: self.fail_toggle,
            }))
        }

        async fn clear_cached_provider(&self) -> crate::Result<()> {
            self.cleared.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config() -> WalletConfig {
        let mut config = WalletConfig::default();
        config.contract.address = "0x55d398326f99059fF775485246999027B3197955".parse().unwrap();
        config.contract.abi = parse_abi(TOKEN_ABI).unwrap();
        config
    }

    fn connector(
        selectors: Arc<FakeSelectors>,
        alerts: Arc<RecordingAlerts>,
    ) -> WalletConnector {
        WalletConnector::new(config(), WalletStore::new(), selectors, alerts).unwrap()
    }

    #[tokio::test]
    async fn test_connect_on_target_chain_populates_store() {
        let selectors = Arc::new(FakeSelectors::with(Arc::new(ScriptedConnection::wallet(
            56,
            &[account(), other_account()],
        ))));
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = connector(selectors.clone(), alerts.clone());

        let outcome = connector.connect().await;
        assert!(matches!(
            outcome,
            ConnectOutcome::Connected { account: a, chain_id: 56 } if a == account()
        ));

        let state = connector.store().read();
        assert!(state.is_connected());
        assert_eq!(state.account, Some(account()));

        let provider = state.provider.as_ref().unwrap();
        let signer = state.signer.as_ref().unwrap();
        let contract = state.contract.as_ref().unwrap();
        assert!(Arc::ptr_eq(signer.provider(), provider));
        assert!(Arc::ptr_eq(contract.signer().provider(), provider));
        assert_eq!(contract.address(), connector.config().contract.address);

        assert!(alerts.take().is_empty());
        assert_eq!(selectors.toggles.load(Ordering::SeqCst), 1);
        let built = selectors.built.lock().unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].walletconnect().unwrap().chain_id, 56);
    }

    #[tokio::test]
    async fn test_connect_commits_fields_in_order() {
        let selectors = Arc::new(FakeSelectors::with(Arc::new(ScriptedConnection::wallet(
            56,
            &[account()],
        ))));
        let connector = connector(selectors, Arc::new(RecordingAlerts::default()));

        let actions = Arc::new(Mutex::new(Vec::new()));
        let seen = actions.clone();
        connector
            .store()
            .subscribe(move |action, _| seen.lock().unwrap().push(action.name()));

        connector.connect().await;
        assert_eq!(
            *actions.lock().unwrap(),
            vec!["set_current_account", "set_provider", "set_contract", "set_signer"]
        );
    }

    #[tokio::test]
    async fn test_disconnect_resets_everything() {
        let selectors = Arc::new(FakeSelectors::with(Arc::new(ScriptedConnection::wallet(
            56,
            &[account()],
        ))));
        let connector = connector(selectors.clone(), Arc::new(RecordingAlerts::default()));

        connector.connect().await;
        assert!(connector.store().is_connected());

        connector.disconnect().await;
        assert!(connector.store().read().is_empty());
        assert_eq!(selectors.cleared.load(Ordering::SeqCst), 1);

        // Disconnecting an empty store is fine too
        connector.disconnect().await;
        assert!(connector.store().read().is_empty());
    }

    #[tokio::test]
    async fn test_selector_failure_resets_and_alerts_once() {
        let selectors = Arc::new(FakeSelectors::default());
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = connector(selectors, alerts.clone());
        connector.store().set_account(Some(other_account()));

        let outcome = connector.connect().await;
        assert!(matches!(
            outcome,
            ConnectOutcome::Failed(ConnectError::Selector(_))
        ));
        assert!(connector.store().read().is_empty());

        let raised = alerts.take();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].severity, Severity::Error);
        assert_eq!(raised[0].message, "Wallet connection failed.");
    }

    #[tokio::test]
    async fn test_network_failure_resets_and_alerts_once() {
        let connection = ScriptedConnection::wallet(56, &[account()]).respond(
            "eth_chainId",
            Err(ProviderRpcError::new(ProviderRpcError::DISCONNECTED, "gone")),
        );
        let selectors = Arc::new(FakeSelectors::with(Arc::new(connection)));
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = connector(selectors, alerts.clone());

        let outcome = connector.connect().await;
        assert!(matches!(
            outcome,
            ConnectOutcome::Failed(ConnectError::Provider(ref e)) if e.code == ProviderRpcError::DISCONNECTED
        ));
        assert!(connector.store().read().is_empty());
        assert_eq!(alerts.take().len(), 1);
    }

    #[tokio::test]
    async fn test_signer_failure_resets_and_alerts_once() {
        // Right chain, but the wallet exposes no account to sign with
        let selectors = Arc::new(FakeSelectors::with(Arc::new(ScriptedConnection::wallet(
            56,
            &[],
        ))));
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = connector(selectors, alerts.clone());
        connector.store().set_account(Some(other_account()));

        let outcome = connector.connect().await;
        assert!(matches!(outcome, ConnectOutcome::Failed(_)));
        assert!(connector.store().read().is_empty());

        let raised = alerts.take();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_wrong_chain_without_injected_wallet_warns() {
        let selectors = Arc::new(FakeSelectors::with(Arc::new(ScriptedConnection::wallet(
            1,
            &[account()],
        ))));
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = connector(selectors, alerts.clone());
        connector.store().set_account(Some(other_account()));

        let outcome = connector.connect().await;
        assert!(matches!(outcome, ConnectOutcome::SwitchPrompted { from: 1 }));

        // Untouched
        assert_eq!(connector.store().read().account, Some(other_account()));

        let raised = alerts.take();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].severity, Severity::Warning);
        assert_eq!(
            raised[0].message,
            "Please switch your wallet to Binance Smart Chain."
        );
    }

    #[tokio::test]
    async fn test_wrong_chain_switches_known_chain() {
        let selectors = Arc::new(FakeSelectors::with(Arc::new(ScriptedConnection::wallet(
            1,
            &[account()],
        ))));
        let injected = Arc::new(
            ScriptedConnection::new().respond("wallet_switchEthereumChain", Ok(Value::Null)),
        );
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = connector(selectors, alerts.clone()).with_injected(injected.clone());

        let outcome = connector.connect().await;
        assert!(matches!(outcome, ConnectOutcome::ChainSwitched { from: 1 }));
        assert_eq!(injected.methods(), vec!["wallet_switchEthereumChain"]);
        assert!(alerts.take().is_empty());
        assert!(connector.store().read().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_chain_is_registered_with_wallet() {
        // Target 56 (BSC), wallet on 1 (Ethereum), switch rejects with 4902
        let selectors = Arc::new(FakeSelectors::with(Arc::new(ScriptedConnection::wallet(
            1,
            &[account()],
        ))));
        let injected = Arc::new(
            ScriptedConnection::new()
                .respond(
                    "wallet_switchEthereumChain",
                    Err(ProviderRpcError::new(4902, "Unrecognized chain ID \"0x38\"")),
                )
                .respond("wallet_addEthereumChain", Ok(Value::Null)),
        );
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = connector(selectors, alerts.clone()).with_injected(injected.clone());

        let outcome = connector.connect().await;
        assert!(matches!(outcome, ConnectOutcome::ChainAdded { from: 1 }));

        let calls = injected.calls();
        assert_eq!(calls.len(), 2);
        let (method, params) = &calls[1];
        assert_eq!(method, "wallet_addEthereumChain");
        assert_eq!(
            params,
            &json!([{
                "chainId": "0x38",
                "chainName": "Binance Smart Chain",
                "rpcUrls": ["https://bsc-dataseed1.binance.org/"],
                "blockExplorerUrls": ["https://bscscan.com"],
                "nativeCurrency": {"name": "BNB", "symbol": "BNB", "decimals": 18}
            }])
        );

        assert!(alerts.take().is_empty());
        assert!(connector.store().read().is_empty());
    }

    #[tokio::test]
    async fn test_other_switch_error_resets_and_alerts() {
        let selectors = Arc::new(FakeSelectors::with(Arc::new(ScriptedConnection::wallet(
            1,
            &[account()],
        ))));
        let injected = Arc::new(ScriptedConnection::new().respond(
            "wallet_switchEthereumChain",
            Err(ProviderRpcError::new(4001, "User rejected the request.")),
        ));
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = connector(selectors, alerts.clone()).with_injected(injected.clone());
        connector.store().set_account(Some(other_account()));

        let outcome = connector.connect().await;
        assert!(matches!(
            outcome,
            ConnectOutcome::Failed(ConnectError::Chain(ChainSwitchError::Switch(_)))
        ));
        assert_eq!(injected.methods(), vec!["wallet_switchEthereumChain"]);
        assert!(connector.store().read().is_empty());

        let raised = alerts.take();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].severity, Severity::Error);
        assert_eq!(raised[0].message, "Wallet connection failed.");
    }

    #[tokio::test]
    async fn test_toggle_modal_failure_resets_and_alerts_once() {
        let selectors = Arc::new(FakeSelectors {
            fail_toggle: true,
            ..FakeSelectors::with(Arc::new(ScriptedConnection::wallet(56, &[account()])))
        });
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = connector(selectors.clone(), alerts.clone());
        connector.store().set_account(Some(other_account()));

        let outcome = connector.connect().await;
        assert!(matches!(
            outcome,
            ConnectOutcome::Failed(ConnectError::Selector(_))
        ));
        assert_eq!(selectors.toggles.load(Ordering::SeqCst), 1);
        assert!(connector.store().read().is_empty());

        let raised = alerts.take();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_add_chain_failure_resets_and_alerts() {
        let selectors = Arc::new(FakeSelectors::with(Arc::new(ScriptedConnection::wallet(
            1,
            &[account()],
        ))));
        let injected = Arc::new(
            ScriptedConnection::new()
                .respond(
                    "wallet_switchEthereumChain",
                    Err(ProviderRpcError::new(4902, "Unrecognized chain ID \"0x38\".")),
                )
                .respond(
                    "wallet_addEthereumChain",
                    Err(ProviderRpcError::new(4001, "User rejected the request.")),
                ),
        );
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = connector(selectors, alerts.clone()).with_injected(injected.clone());
        connector.store().set_account(Some(other_account()));

        let outcome = connector.connect().await;
        assert!(matches!(
            outcome,
            ConnectOutcome::Failed(ConnectError::Chain(ChainSwitchError::Add(ref e)))
                if e.is_user_rejection()
        ));
        assert_eq!(
            injected.methods(),
            vec!["wallet_switchEthereumChain", "wallet_addEthereumChain"]
        );
        assert!(connector.store().read().is_empty());

        let raised = alerts.take();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].severity, Severity::Error);
        assert_eq!(raised[0].message, "Wallet connection failed.");
    }

    #[tokio::test]
    async fn test_overlapping_connect_is_rejected() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let selectors = Arc::new(FakeSelectors {
            connection: Some(Arc::new(ScriptedConnection::wallet(56, &[account()]))),
            started: Some(started.clone()),
            release: Some(release.clone()),
            ..Default::default()
        });
        let alerts = Arc::new(RecordingAlerts::default());
        let connector = Arc::new(connector(selectors, alerts.clone()));

        let first = tokio::spawn({
            let connector = connector.clone();
            async move { connector.connect().await }
        });
        started.notified().await;
        assert!(connector.is_connecting());

        assert!(matches!(connector.connect().await, ConnectOutcome::Busy));

        release.notify_one();
        assert!(first.await.unwrap().is_connected());
        assert!(!connector.is_connecting());
        assert!(alerts.take().is_empty());
    }
}
