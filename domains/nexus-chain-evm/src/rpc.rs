// Minimal JSON-RPC 2.0 client over reqwest

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use nexus_error::{ChainError, ChainResult};

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC client for one endpoint
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Issue a single call. Transport failures map to `RpcUnavailable`;
    /// endpoint error objects are classified by message.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::rpc_unavailable(format!("{method}: {e}")))?;

        let parsed: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainError::protocol(format!("{method}: malformed response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(classify_rpc_error(method, err.code, &err.message));
        }

        parsed
            .result
            .ok_or_else(|| ChainError::protocol(format!("{method}: response carried no result")))
    }
}

/// Map a JSON-RPC error object into the adapter failure taxonomy
fn classify_rpc_error(method: &str, code: i64, message: &str) -> ChainError {
    let lowered = message.to_lowercase();
    if lowered.contains("insufficient funds") || lowered.contains("insufficient lamports") {
        ChainError::insufficient_funds(format!("{method}: {message}"))
    } else if lowered.contains("revert") || lowered.contains("execution reverted") {
        ChainError::reverted(format!("{method}: {message}"))
    } else {
        ChainError::protocol(format!("{method}: rpc error {code}: {message}"))
    }
}

/// Parse a 0x-hex quantity into u128
pub fn parse_quantity(value: &str) -> ChainResult<u128> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    u128::from_str_radix(stripped, 16)
        .map_err(|e| ChainError::protocol(format!("bad quantity {value}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_parse() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x3b9aca00").unwrap(), 1_000_000_000);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn error_classification() {
        assert!(matches!(
            classify_rpc_error("eth_sendTransaction", -32000, "insufficient funds for gas"),
            ChainError::InsufficientFunds(_)
        ));
        assert!(matches!(
            classify_rpc_error("eth_call", 3, "execution reverted: already deployed"),
            ChainError::TransactionReverted(_)
        ));
        assert!(matches!(
            classify_rpc_error("eth_call", -32601, "method not found"),
            ChainError::Protocol(_)
        ));
    }
}
