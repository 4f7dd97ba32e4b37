// JSON-RPC client for SVM endpoints

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use nexus_error::{ChainError, ChainResult};

/// SVM read calls wrap their payload in a context envelope
#[derive(Debug, Deserialize)]
pub struct WithContext<T> {
    pub value: T,
}

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
    } else if lowered.contains("custom program error") || lowered.contains("instructionerror") {
        ChainError::reverted(format!("{method}: {message}"))
    } else {
        ChainError::protocol(format!("{method}: rpc error {code}: {message}"))
    }
}
