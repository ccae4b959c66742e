//! Signer backed by the connected wallet
//!
//! The wallet holds the key. This handle only asks it to sign or send on behalf
//! of one account; nothing here ever sees key material.

use super::{ProviderRpcError, Web3Provider};
use alloy::primitives::{hex, Address, Bytes, B256};
use alloy::rpc::types::TransactionRequest;
use serde_json::{json, Value};
use std::sync::Arc;

/// Transaction-signing handle for one account
#[derive(Debug, Clone)]
pub struct JsonRpcSigner {
    provider: Arc<Web3Provider>,
    address: Address,
}

impl JsonRpcSigner {
    pub fn new(provider: Arc<Web3Provider>, address: Address) -> Self {
        Self { provider, address }
    }

    /// Account this signer acts for
    pub fn address(&self) -> Address {
        self.address
    }

    /// Provider the signer was derived from
    pub fn provider(&self) -> &Arc<Web3Provider> {
        &self.provider
    }

    /// Ask the wallet to sign and broadcast a transaction; returns its hash
    pub async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<B256, ProviderRpcError> {
        let tx = tx.from(self.address);
        let params = serde_json::to_value(&tx).map_err(|e| {
            ProviderRpcError::new(ProviderRpcError::INTERNAL, format!("encode tx: {}", e))
        })?;

        tracing::debug!(from = %self.address, "Requesting eth_sendTransaction");
        let value = self
            .provider
            .send("eth_sendTransaction", Value::Array(vec![params]))
            .await?;
        serde_json::from_value(value.clone())
            .map_err(|_| ProviderRpcError::invalid_response("eth_sendTransaction", &value))
    }

    /// EIP-191 `personal_sign` over `message`
    pub async fn sign_message(&self, message: &[u8]) -> Result<Bytes, ProviderRpcError> {
        let payload = format!("0x{}", hex::encode(message));
        let value = self
            .provider
            .send("personal_sign", json!([payload, self.address]))
            .await?;
        serde_json::from_value(value.clone())
            .map_err(|_| ProviderRpcError::invalid_response("personal_sign", &value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedConnection;
    use alloy::primitives::U256;

    fn account() -> Address {
        "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
    }

    #[tokio::test]
    async fn test_send_transaction_sets_from() {
        let hash = B256::repeat_byte(0xab);
        let connection = Arc::new(
            ScriptedConnection::wallet(56, &[account()])
                .respond("eth_sendTransaction", Ok(json!(hash))),
        );
        let provider = Arc::new(Web3Provider::new(connection.clone()));
        let signer = JsonRpcSigner::new(provider, account());

        let to: Address = "0x000000000000000000000000000000000000dEaD".parse().unwrap();
        let tx = TransactionRequest::default().to(to).value(U256::from(1u64));
        assert_eq!(signer.send_transaction(tx).await.unwrap(), hash);

        let (method, params) = connection.calls().pop().unwrap();
        assert_eq!(method, "eth_sendTransaction");
        let from: Address = serde_json::from_value(params[0]["from"].clone()).unwrap();
        assert_eq!(from, account());
    }

    #[tokio::test]
    async fn test_sign_message_hex_encodes_payload() {
        let connection = Arc::new(
            ScriptedConnection::wallet(56, &[account()]).respond("personal_sign", Ok(json!("0x1234"))),
        );
        let signer = JsonRpcSigner::new(Arc::new(Web3Provider::new(connection.clone())), account());

        let signature = signer.sign_message(b"hi").await.unwrap();
        assert_eq!(signature.to_vec(), vec![0x12u8, 0x34]);

        let (_, params) = connection.calls().pop().unwrap();
        assert_eq!(params[0], "0x6869");
    }
}
