//! EIP-1193 over HTTP JSON-RPC
//!
//! Lets the connector talk to a node or a wallet bridge that speaks plain
//! JSON-RPC 2.0. JSON-RPC error objects come back as `ProviderRpcError` with
//! their original code, so wallet codes such as 4902 survive the hop.

use super::{Eip1193, ProviderRpcError};
use alloy::rpc::client::RpcClient;
use alloy::transports::{RpcError, TransportError, TransportErrorKind};
use async_trait::async_trait;
use serde_json::Value;

/// JSON-RPC 2.0 transport
pub struct HttpTransport {
    client: RpcClient,
    url: url::Url,
}

impl HttpTransport {
    pub fn new(url: url::Url) -> Self {
        Self {
            client: RpcClient::new_http(url.clone()),
            url,
        }
    }

    /// Parse `url` and build a transport for it
    pub fn from_url(url: &str) -> crate::Result<Self> {
        let url: url::Url = url
            .parse()
            .map_err(|e| crate::Error::InvalidArgument(format!("Invalid RPC URL: {}", e)))?;
        Ok(Self::new(url))
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

#[async_trait]
impl Eip1193 for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        tracing::debug!(method = method, url = %self.url, "JSON-RPC request");

        self.client
            .request::<Value, Value>(method.to_string(), params)
            .await
            .map_err(into_provider_error)
    }
}

/// Keep the wallet's error object; anything below JSON-RPC becomes a disconnect
fn into_provider_error(err: TransportError) -> ProviderRpcError {
    match err {
        RpcError::ErrorResp(payload) => ProviderRpcError {
            code: payload.code,
            message: payload.message.into_owned(),
            data: payload
                .data
                .and_then(|raw| serde_json::from_str(raw.get()).ok()),
        },
        RpcError::Transport(kind) => {
            let message = match kind {
                TransportErrorKind::HttpError(http) => format!("HTTP error {}", http.status),
                other => other.to_string(),
            };
            ProviderRpcError::new(ProviderRpcError::DISCONNECTED, message)
        }
        other => ProviderRpcError::new(
            ProviderRpcError::INTERNAL,
            format!("invalid JSON-RPC response: {}", other),
        ),
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url.as_str())
            .finish()
    }
}
