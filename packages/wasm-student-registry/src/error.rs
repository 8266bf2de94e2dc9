//! Error types for wasm-student-registry

use crate::contract::RevertReason;
use crate::provider::RpcError;
use thiserror::Error;
use wasm_bindgen::prelude::*;

/// Main error type for registry operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// No injected wallet provider (e.g. `window.ethereum` is missing)
    #[error("No wallet provider available")]
    ProviderUnavailable,
    /// The user declined the account access request
    #[error("Account authorization rejected: {0}")]
    AuthorizationRejected(String),
    /// An account access request is already waiting in the wallet
    #[error("Account authorization request already pending")]
    AuthorizationPending,
    /// A write was requested without an authorized session
    #[error("Wallet not connected")]
    NotConnected,
    /// User input rejected before reaching the network
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    /// The dry-run reverted; nothing was broadcast
    #[error("Simulation reverted: {0}")]
    SimulationReverted(RevertReason),
    /// Signing or broadcast failed after a successful simulation
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),
    /// The transaction was included but reverted
    #[error("Transaction {hash} reverted")]
    TransactionReverted { hash: String },
    /// Receipt polling gave up before the transaction was included
    #[error("Transaction {hash} not confirmed after {polls} polls")]
    ConfirmationTimeout { hash: String, polls: u32 },
    /// A read failed (network or decoding)
    #[error("Query failed: {0}")]
    QueryFailed(String),
    /// A new attempt was started while the previous one is still pending
    #[error("A {0} transaction is already pending")]
    AttemptInProgress(String),
    /// Invalid address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    /// Invalid configuration or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// ABI or JSON decoding error
    #[error("Decode error: {0}")]
    Decode(String),
}

impl RegistryError {
    /// Best raw reason string available for this error, without the
    /// variant prefix added by `Display`.
    pub fn raw_reason(&self) -> String {
        match self {
            RegistryError::AuthorizationRejected(s)
            | RegistryError::ValidationFailed(s)
            | RegistryError::SubmissionFailed(s)
            | RegistryError::QueryFailed(s)
            | RegistryError::InvalidAddress(s)
            | RegistryError::InvalidInput(s)
            | RegistryError::Decode(s) => s.clone(),
            RegistryError::SimulationReverted(reason) => reason.to_string(),
            other => other.to_string(),
        }
    }

    /// Errors that are resolved locally and never move an attempt out of Idle
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            RegistryError::ProviderUnavailable
                | RegistryError::NotConnected
                | RegistryError::ValidationFailed(_)
        )
    }
}

impl From<alloy_sol_types::Error> for RegistryError {
    fn from(err: alloy_sol_types::Error) -> Self {
        RegistryError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Decode(err.to_string())
    }
}

impl From<RpcError> for RegistryError {
    fn from(err: RpcError) -> Self {
        RegistryError::QueryFailed(err.to_string())
    }
}

// REQUIRED: Converts to JS Error with stack trace
impl From<RegistryError> for JsValue {
    fn from(err: RegistryError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
