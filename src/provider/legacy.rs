//! Account enumeration over the raw connection

use super::{parse_accounts, Eip1193, ProviderRpcError, RawConnection};
use alloy::primitives::Address;
use serde_json::json;

/// Thin provider used only to list the connected accounts
pub struct AccountsProvider {
    connection: RawConnection,
}

impl AccountsProvider {
    pub fn new(connection: RawConnection) -> Self {
        Self { connection }
    }

    /// Accounts exposed by the wallet; index 0 is the active one
    pub async fn get_accounts(&self) -> Result<Vec<Address>, ProviderRpcError> {
        let value = self.connection.request("eth_accounts", json!([])).await?;
        parse_accounts("eth_accounts", value)
    }
}
