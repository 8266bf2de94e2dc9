//! Typed JSON-RPC clients
//!
//! `ReadClient` is network-only and unauthenticated; `WriteClient` is bound
//! to one wallet account and is the only way to broadcast a transaction.

use crate::error::RegistryError;
use crate::provider::{JsonRpc, RpcError, WalletProvider};
use crate::types::{Receipt, ReceiptStatus};
use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::rc::Rc;

/// Transaction-shaped call object for `eth_call` / `eth_sendTransaction`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    pub data: String,
}

/// Receipt as returned by `eth_getTransactionReceipt`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    status: Option<String>,
    block_number: Option<String>,
}

/// Parse a JSON-RPC hex quantity (`0x1a`)
pub fn parse_quantity(value: &str) -> Result<u64, RegistryError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| RegistryError::Decode(format!("quantity without 0x prefix: {}", value)))?;
    if digits.is_empty() {
        return Err(RegistryError::Decode("empty quantity".to_string()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| RegistryError::Decode(format!("invalid quantity {}: {}", value, e)))
}

/// Parse `0x`-prefixed hex data
pub fn parse_bytes(value: &Value) -> Result<Vec<u8>, RegistryError> {
    let s = value
        .as_str()
        .ok_or_else(|| RegistryError::Decode(format!("expected hex string, got {}", value)))?;
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| RegistryError::Decode(format!("hex data without 0x prefix: {}", s)))?;
    hex::decode(digits).map_err(|e| RegistryError::Decode(format!("invalid hex data: {}", e)))
}

fn parse_receipt(raw: RawReceipt) -> Result<Receipt, RegistryError> {
    let status = match raw.status.as_deref() {
        Some("0x1") => ReceiptStatus::Success,
        Some("0x0") => ReceiptStatus::Reverted,
        other => {
            return Err(RegistryError::Decode(format!(
                "unexpected receipt status: {:?}",
                other
            )))
        }
    };
    let block_number = raw.block_number.as_deref().map(parse_quantity).transpose()?;
    Ok(Receipt {
        transaction_hash: raw.transaction_hash,
        status,
        block_number,
    })
}

/// Network-only client used for queries, simulation and receipts
#[derive(Clone)]
pub struct ReadClient {
    transport: Rc<dyn JsonRpc>,
}

impl ReadClient {
    pub fn new(transport: Rc<dyn JsonRpc>) -> Self {
        Self { transport }
    }

    /// `eth_call` against the latest block. The raw RPC error is kept so
    /// callers can tell a revert from a transport failure.
    pub async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, RpcError> {
        trace!("read eth_call to {}", request.to);
        let request =
            serde_json::to_value(request).map_err(|e| RpcError::transport(&e.to_string()))?;
        let value = self
            .transport
            .request("eth_call", json!([request, "latest"]))
            .await?;
        parse_bytes(&value).map_err(|e| RpcError::transport(&e.to_string()))
    }

    /// `eth_getTransactionReceipt`; `None` while the transaction is not included
    pub async fn transaction_receipt(&self, hash: &str) -> Result<Option<Receipt>, RegistryError> {
        trace!("read eth_getTransactionReceipt {}", hash);
        let value = self
            .transport
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let raw: RawReceipt = serde_json::from_value(value)?;
        parse_receipt(raw).map(Some)
    }
}

/// Client bound to one authorized account; signs and broadcasts through the wallet
#[derive(Clone)]
pub struct WriteClient {
    wallet: Rc<dyn WalletProvider>,
    account: String,
}

impl WriteClient {
    pub fn new(wallet: Rc<dyn WalletProvider>, account: String) -> Self {
        Self { wallet, account }
    }

    /// Lowercase hex address this client signs for
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Chain the wallet is currently connected to
    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        trace!("wallet eth_chainId");
        let value = self.wallet.request("eth_chainId", json!([])).await?;
        value
            .as_str()
            .and_then(|s| parse_quantity(s).ok())
            .ok_or_else(|| RpcError::transport(&format!("invalid chain id from wallet: {}", value)))
    }

    /// `eth_sendTransaction` from the bound account; returns the transaction hash
    pub async fn send_transaction(&self, to: &str, data: String) -> Result<String, RpcError> {
        trace!("wallet eth_sendTransaction from {} to {}", self.account, to);
        let request = CallRequest {
            from: Some(self.account.clone()),
            to: to.to_string(),
            data,
        };
        let params = json!([serde_json::to_value(&request)
            .map_err(|e| RpcError::transport(&e.to_string()))?]);
        let value = self.wallet.request("eth_sendTransaction", params).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RpcError::transport(&format!("invalid transaction hash: {}", value)))
    }
}
