//! External provider boundary
//!
//! The wallet (EIP-1193 injected provider) and the read transport both
//! speak Ethereum JSON-RPC. They are modelled as traits so the core can
//! run against `window.ethereum`/`fetch` in the browser and against
//! in-memory doubles in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;
use thiserror::Error;

/// JSON-RPC / EIP-1193 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// EIP-1193: the user rejected the request
    pub const USER_REJECTED: i64 = 4001;
    /// MetaMask: a request of the same type is already waiting for the user
    pub const REQUEST_PENDING: i64 = -32002;
    /// Internal JSON-RPC error (also used for transport failures)
    pub const INTERNAL: i64 = -32603;
    /// Geth-style `execution reverted` with revert bytes in `data`
    pub const EXECUTION_REVERTED: i64 = 3;

    pub fn new(code: i64, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Transport-level failure (network, HTTP, malformed response)
    pub fn transport(message: &str) -> Self {
        Self::new(Self::INTERNAL, message)
    }

    /// Revert bytes carried by the error, if any.
    ///
    /// Nodes put them in `data` directly; wallets tend to wrap them as
    /// `data.data` or `data.originalError.data`.
    pub fn revert_data(&self) -> Option<Vec<u8>> {
        let data = self.data.as_ref()?;
        [
            Some(data),
            data.get("data"),
            data.get("originalError").and_then(|e| e.get("data")),
        ]
        .into_iter()
        .flatten()
        .find_map(|candidate| candidate.as_str().and_then(decode_hex_bytes))
    }
}

fn decode_hex_bytes(s: &str) -> Option<Vec<u8>> {
    let stripped = s.strip_prefix("0x")?;
    hex::decode(stripped).ok()
}

/// A JSON-RPC endpoint
#[async_trait(?Send)]
pub trait JsonRpc {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// Listener for `accountsChanged`; an empty list means the wallet disconnected
pub type AccountsListener = Rc<dyn Fn(Vec<String>)>;

/// Identifies a registered `accountsChanged` listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Injected wallet provider: JSON-RPC plus account change notifications
pub trait WalletProvider: JsonRpc {
    fn add_accounts_listener(&self, listener: AccountsListener) -> ListenerId;
    fn remove_accounts_listener(&self, id: ListenerId);
}

/// Handle to an `accountsChanged` subscription
///
/// The listener is removed on [`AccountsSubscription::cancel`] or when the
/// handle is dropped, whichever happens first.
pub struct AccountsSubscription {
    provider: Rc<dyn WalletProvider>,
    id: Option<ListenerId>,
}

impl AccountsSubscription {
    pub fn new(provider: Rc<dyn WalletProvider>, listener: AccountsListener) -> Self {
        let id = provider.add_accounts_listener(listener);
        Self {
            provider,
            id: Some(id),
        }
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(id) = self.id.take() {
            self.provider.remove_accounts_listener(id);
        }
    }
}

impl Drop for AccountsSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Delay source for receipt polling
#[async_trait(?Send)]
pub trait Sleeper {
    async fn sleep(&self, millis: u32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockWallet;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn test_revert_data_locations() {
        let direct = RpcError::new(3, "execution reverted").with_data(json!("0x01020304"));
        assert_eq!(direct.revert_data(), Some(vec![1, 2, 3, 4]));

        let nested = RpcError::new(-32603, "Internal JSON-RPC error.")
            .with_data(json!({ "code": 3, "data": "0xdeadbeef" }));
        assert_eq!(nested.revert_data(), Some(vec![0xde, 0xad, 0xbe, 0xef]));

        let nested = RpcError::new(-32603, "Internal JSON-RPC error.")
            .with_data(json!({ "originalError": { "data": "0x0a" } }));
        assert_eq!(nested.revert_data(), Some(vec![0x0a]));

        let none = RpcError::new(-32000, "header not found").with_data(json!({ "foo": 1 }));
        assert_eq!(none.revert_data(), None);
    }

    #[test]
    fn test_rpc_error_deserializes() {
        let err: RpcError =
            serde_json::from_value(json!({ "code": 4001, "message": "User rejected" })).unwrap();
        assert_eq!(err.code, RpcError::USER_REJECTED);
        assert_eq!(err.data, None);
    }

    #[test]
    fn test_subscription_cancel_and_drop() {
        let wallet = Rc::new(MockWallet::new(vec![]));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        let mut first = AccountsSubscription::new(
            wallet.clone(),
            Rc::new(move |accounts: Vec<String>| sink.borrow_mut().push(accounts)),
        );
        let sink = seen.clone();
        let second = AccountsSubscription::new(
            wallet.clone(),
            Rc::new(move |accounts: Vec<String>| sink.borrow_mut().push(accounts)),
        );
        assert_eq!(wallet.listener_count(), 2);

        first.cancel();
        assert!(!first.is_active());
        assert_eq!(wallet.listener_count(), 1);

        drop(second);
        assert_eq!(wallet.listener_count(), 0);

        wallet.emit_accounts_changed(vec!["0x01".to_string()]);
        assert!(seen.borrow().is_empty());
    }
}
