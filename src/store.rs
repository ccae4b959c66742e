//! Connection state store
//!
//! Holds the account/provider/signer/contract tuple and fans every mutation out
//! to subscribers. Writes go through a closed set of actions; each replaces
//! exactly one field.
//!
//! Listeners run synchronously, in registration order, after the state has been
//! updated. Async consumers that only care about the latest snapshot can use
//! [`WalletStore::watch`] instead.

use crate::contract::ContractBinding;
use crate::provider::{JsonRpcSigner, Web3Provider};
use alloy::primitives::Address;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Snapshot of the wallet connection
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub account: Option<Address>,
    pub provider: Option<Arc<Web3Provider>>,
    pub signer: Option<JsonRpcSigner>,
    pub contract: Option<ContractBinding>,
}

impl ConnectionState {
    /// All four fields populated
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
            && self.provider.is_some()
            && self.signer.is_some()
            && self.contract.is_some()
    }

    /// All four fields cleared
    pub fn is_empty(&self) -> bool {
        self.account.is_none()
            && self.provider.is_none()
            && self.signer.is_none()
            && self.contract.is_none()
    }
}

/// Store mutations
#[derive(Debug, Clone)]
pub enum StoreAction {
    SetCurrentAccount(Option<Address>),
    SetProvider(Option<Arc<Web3Provider>>),
    SetContract(Option<ContractBinding>),
    SetSigner(Option<JsonRpcSigner>),
}

impl StoreAction {
    pub fn name(&self) -> &'static str {
        match self {
            StoreAction::SetCurrentAccount(_) => "set_current_account",
            StoreAction::SetProvider(_) => "set_provider",
            StoreAction::SetContract(_) => "set_contract",
            StoreAction::SetSigner(_) => "set_signer",
        }
    }
}

fn reduce(state: &mut ConnectionState, action: StoreAction) {
    match action {
        StoreAction::SetCurrentAccount(account) => state.account = account,
        StoreAction::SetProvider(provider) => state.provider = provider,
        StoreAction::SetContract(contract) => state.contract = contract,
        StoreAction::SetSigner(signer) => state.signer = signer,
    }
}

/// Callback invoked after every mutation
pub type Listener = Arc<dyn Fn(&StoreAction, &ConnectionState) + Send + Sync>;

/// Handle returned by [`WalletStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Inner {
    state: watch::Sender<ConnectionState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

/// Shared, cloneable handle to the connection state
#[derive(Clone)]
pub struct WalletStore {
    inner: Arc<Inner>,
}

impl WalletStore {
    /// A store in the disconnected state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: watch::Sender::new(ConnectionState::default()),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Current snapshot
    pub fn read(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().is_connected()
    }

    /// Apply one mutation and notify subscribers
    pub fn dispatch(&self, action: StoreAction) {
        tracing::trace!(action = action.name(), "Store dispatch");
        self.inner
            .state
            .send_modify(|state| reduce(state, action.clone()));

        let snapshot = self.read();
        // Clone the list so listeners may (un)subscribe without deadlocking
        let listeners: Vec<Listener> = self
            .lock_listeners()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&action, &snapshot);
        }
    }

    pub fn set_account(&self, account: Option<Address>) {
        self.dispatch(StoreAction::SetCurrentAccount(account));
    }

    pub fn set_provider(&self, provider: Option<Arc<Web3Provider>>) {
        self.dispatch(StoreAction::SetProvider(provider));
    }

    pub fn set_contract(&self, contract: Option<ContractBinding>) {
        self.dispatch(StoreAction::SetContract(contract));
    }

    pub fn set_signer(&self, signer: Option<JsonRpcSigner>) {
        self.dispatch(StoreAction::SetSigner(signer));
    }

    /// Register a synchronous listener
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreAction, &ConnectionState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Receiver that always holds the latest snapshot
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        // A panicking listener must not take the store down with it
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for WalletStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WalletStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletStore")
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
