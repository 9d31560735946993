//! Minimal EVM JSON-RPC client (Flow EVM testnet by default).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{WalletError, WalletResult};

/// Native token decimals on EVM chains.
const NATIVE_DECIMALS: u32 = 18;

/// A native-token balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// Raw amount in wei.
    pub wei: u128,
    /// Human readable amount (`1.5`).
    pub formatted: String,
}

impl Balance {
    pub fn from_wei(wei: u128) -> Self {
        Self {
            wei,
            formatted: format_units(wei, NATIVE_DECIMALS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Read-only JSON-RPC client.
#[derive(Debug)]
pub struct EvmRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl EvmRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// `eth_chainId`.
    pub async fn chain_id(&self) -> WalletResult<u64> {
        let result = self.call("eth_chainId", json!([])).await?;
        let quantity = parse_quantity(&result)?;
        u64::try_from(quantity).map_err(|e| WalletError::InvalidResult(e.to_string()))
    }

    /// `eth_getBalance` at the latest block.
    pub async fn balance(&self, address: &str) -> WalletResult<Balance> {
        validate_address(address)?;
        let result = self.call("eth_getBalance", json!([address, "latest"])).await?;
        Ok(Balance::from_wei(parse_quantity(&result)?))
    }

    async fn call(&self, method: &str, params: Value) -> WalletResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WalletError::Request(format!("HTTP {}", status)));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| WalletError::InvalidResult(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(WalletError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        parsed
            .result
            .ok_or_else(|| WalletError::InvalidResult(format!("{} returned no result", method)))
    }
}

/// Check `0x` + 40 hex digits.
pub fn validate_address(address: &str) -> WalletResult<()> {
    let hex = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| WalletError::InvalidAddress(address.to_string()))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WalletError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

/// Decode a hex `QUANTITY` (`"0x1a"`).
fn parse_quantity(value: &Value) -> WalletResult<u128> {
    let raw = value
        .as_str()
        .ok_or_else(|| WalletError::InvalidResult(format!("expected hex string, got {}", value)))?;
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| WalletError::InvalidResult(format!("missing 0x prefix: {}", raw)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| WalletError::InvalidResult(e.to_string()))
}

/// Format an integer amount with `decimals` fractional digits, trimming zeros.
fn format_units(amount: u128, decimals: u32) -> String {
    let unit = 10u128.pow(decimals);
    let whole = amount / unit;
    let frac = amount % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
