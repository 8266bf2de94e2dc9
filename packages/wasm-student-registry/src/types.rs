//! Shared types for student registry operations

use serde::{Deserialize, Serialize};
use std::fmt;

/// A student record as stored by the registry contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Student identifier (MSSV), the unique key
    pub id: u64,
    /// Display name
    pub name: String,
    /// Birth year
    pub birth_year: u64,
    /// Management class label
    pub class_label: String,
    /// Authoritative existence flag; `false` means the slot is empty
    pub exists: bool,
    /// Completed course identifiers, only present when explicitly fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_courses: Option<Vec<u64>>,
}

/// Pending form fields for the add action, as entered by the user
///
/// Numeric fields are signed so that negative input can be represented
/// and rejected by validation instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentForm {
    pub id: i64,
    pub name: String,
    pub birth_year: i64,
    pub class_label: String,
}

/// Write action kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxKind {
    Add,
    Update,
    Delete,
}

impl TxKind {
    /// Parse from the JS-facing name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "add" => Some(TxKind::Add),
            "update" => Some(TxKind::Update),
            "delete" => Some(TxKind::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Add => write!(f, "add"),
            TxKind::Update => write!(f, "update"),
            TxKind::Delete => write!(f, "delete"),
        }
    }
}

/// Lifecycle state of a transaction attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

impl TxStatus {
    /// Success and Error end an attempt (a new attempt may start afterwards)
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Success | TxStatus::Error)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Idle => write!(f, "idle"),
            TxStatus::Pending => write!(f, "pending"),
            TxStatus::Success => write!(f, "success"),
            TxStatus::Error => write!(f, "error"),
        }
    }
}

/// Binary outcome of an included transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Receipt of an included transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: String,
    pub status: ReceiptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Result of one range listing fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingQuery {
    /// Start index, passed to the contract as-is
    pub start: u64,
    /// End index, passed to the contract as-is
    pub end: u64,
    /// Existing records in contract index order
    pub records: Vec<Record>,
}
