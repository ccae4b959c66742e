//! dApp Wallet Connector
//!
//! Connects a user's wallet to an EVM dApp and keeps the resulting
//! account/provider/signer/contract handles in a shared, observable store:
//! - Opens a wallet selector and derives provider, signer and contract binding
//! - Enforces the target chain, asking injected wallets to switch or register it
//! - Resets everything and raises a generic alert on any failure
//!
//! # Design
//!
//! - The store is an injected handle, not a global; mutations are a closed enum
//! - Wallet selector, injected wallet and alert display are trait seams
//! - Keys never enter this crate: signing is always delegated to the wallet

pub mod alert;
pub mod config;
pub mod connector;
pub mod contract;
pub mod injected;
pub mod provider;
pub mod selector;
pub mod store;

mod error;

// Re-export commonly used types
pub use alert::{Alert, AlertSink, Severity};
pub use config::{TargetChain, WalletConfig};
pub use connector::{ConnectError, ConnectOutcome, WalletConnector};
pub use error::{Error, Result};
pub use store::{ConnectionState, StoreAction, WalletStore};
