//! Contract binding
//!
//! Pairs a deployed address and its JSON ABI with the wallet signer so the rest
//! of the dApp can call into the contract by function name.

use crate::provider::{JsonRpcSigner, ProviderRpcError};
use crate::{Error, Result};
use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::TransactionRequest;
use serde_json::json;
use std::sync::Arc;

/// Invocable handle to a deployed contract
#[derive(Debug, Clone)]
pub struct ContractBinding {
    address: Address,
    abi: Arc<JsonAbi>,
    signer: JsonRpcSigner,
}

impl ContractBinding {
    pub fn new(address: Address, abi: impl Into<Arc<JsonAbi>>, signer: JsonRpcSigner) -> Self {
        Self {
            address,
            abi: abi.into(),
            signer,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    pub fn signer(&self) -> &JsonRpcSigner {
        &self.signer
    }

    /// First overload of `name` taking `arity` arguments
    pub fn function(&self, name: &str, arity: usize) -> Result<&Function> {
        let overloads = self
            .abi
            .function(name)
            .ok_or_else(|| Error::Contract(format!("no function named {}", name)))?;

        overloads
            .iter()
            .find(|f| f.inputs.len() == arity)
            .ok_or_else(|| {
                Error::Contract(format!("{} has no overload taking {} arguments", name, arity))
            })
    }

    /// Calldata for `name(args)`: selector followed by the encoded arguments
    pub fn encode(&self, name: &str, args: &[DynSolValue]) -> Result<Bytes> {
        let function = self.function(name, args.len())?;
        let data = function
            .abi_encode_input(args)
            .map_err(|e| Error::Contract(format!("encode {}: {}", name, e)))?;
        Ok(Bytes::from(data))
    }

    /// Read-only call through the wallet (`eth_call` at latest)
    pub async fn call(&self, name: &str, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        let function = self.function(name, args.len())?;
        let data = self.encode(name, args)?;
        let tx = TransactionRequest::default()
            .from(self.signer.address())
            .to(self.address)
            .input(data.into());

        let value = self
            .signer
            .provider()
            .send("eth_call", json!([tx, "latest"]))
            .await?;
        let output: Bytes = serde_json::from_value(value.clone())
            .map_err(|_| ProviderRpcError::invalid_response("eth_call", &value))?;

        function
            .abi_decode_output(&output)
            .map_err(|e| Error::Contract(format!("decode {}: {}", name, e)))
    }

    /// State-changing call signed and sent by the wallet; returns the tx hash
    pub async fn send(&self, name: &str, args: &[DynSolValue]) -> Result<B256> {
        let data = self.encode(name, args)?;
        let tx = TransactionRequest::default()
            .to(self.address)
            .input(data.into());

        tracing::info!(
            contract = %self.address,
            function = name,
            from = %self.signer.address(),
            "Sending contract transaction"
        );

        Ok(self.signer.send_transaction(tx).await?)
    }
}
