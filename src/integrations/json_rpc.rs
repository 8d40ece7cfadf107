use serde::Deserialize;
use std::time::Duration;

use crate::services::onchain::ChainError;

fn rpc_request(method: &str, params: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    })
}

/// Parses an Ethereum quantity ("0x1b4") into an integer.
pub fn parse_quantity(value: &str) -> Result<u64, ChainError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::Malformed(format!("quantity without 0x prefix: {trimmed}")))?;
    if digits.is_empty() {
        return Err(ChainError::Malformed("empty quantity".to_string()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Malformed(format!("invalid quantity {trimmed}: {e}")))
}

/// Minimal Ethereum JSON-RPC client used for liveness probes.
pub struct JsonRpcClient {
    rpc_url: String,
    client: reqwest::Client,
}

impl JsonRpcClient {
    pub fn new(rpc_url: String, timeout: Duration) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::NotConfigured(format!("HTTP client build failed: {e}")))?;
        Ok(Self { rpc_url, client })
    }

    async fn request_string(&self, method: &str, params: serde_json::Value) -> Result<String, ChainError> {
        let request = rpc_request(method, params);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Timeout(method.to_string())
                } else {
                    ChainError::Unreachable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ChainError::Unreachable(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::Malformed(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(ChainError::Unreachable(format!(
                "{} rpc error {}: {}",
                method, error.code, error.message
            )));
        }
        body.result
            .ok_or_else(|| ChainError::Malformed(format!("{method} response without result")))
    }

    /// Get current block number
    pub async fn get_block_number(&self) -> Result<u64, ChainError> {
        let raw = self
            .request_string("eth_blockNumber", serde_json::json!([]))
            .await?;
        parse_quantity(&raw)
    }

    /// Get chain id
    pub async fn get_chain_id(&self) -> Result<u64, ChainError> {
        let raw = self.request_string("eth_chainId", serde_json::json!([])).await?;
        parse_quantity(&raw)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_request_sets_method_and_id() {
        // Payload carries method and default id
        let req = rpc_request("eth_blockNumber", serde_json::json!([]));
        assert_eq!(req.get("method").and_then(|v| v.as_str()), Some("eth_blockNumber"));
        assert_eq!(req.get("id").and_then(|v| v.as_i64()), Some(1));
        assert_eq!(req.get("jsonrpc").and_then(|v| v.as_str()), Some("2.0"));
    }

    #[test]
    fn parse_quantity_reads_hex() {
        // Hex quantities decode; junk is malformed
        assert_eq!(parse_quantity("0x1b4").ok(), Some(436));
        assert_eq!(parse_quantity("0x0").ok(), Some(0));
        assert!(matches!(parse_quantity("1b4"), Err(ChainError::Malformed(_))));
        assert!(matches!(parse_quantity("0x"), Err(ChainError::Malformed(_))));
    }

    #[test]
    fn rpc_response_with_error_body_parses() {
        // JSON-RPC error bodies are read, not dropped
        let body: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#,
        )
        .expect("valid body");
        assert!(body.result.is_none());
        assert_eq!(body.error.map(|e| e.code), Some(-32601));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_reported() {
        // Closed port surfaces as a probe failure
        let client = JsonRpcClient::new(
            "http://127.0.0.1:9".to_string(),
            Duration::from_millis(200),
        )
        .expect("client builds");
        let result = client.get_block_number().await;
        assert!(matches!(
            result,
            Err(ChainError::Unreachable(_)) | Err(ChainError::Timeout(_))
        ));
    }
}
